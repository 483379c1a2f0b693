//! C4: a background sweep that deletes sessions idle past the configured
//! timeout.

use crate::registry::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{info, warn};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the periodic idle-session sweep on a background task until
/// [`IdleReaper::shutdown`] is called.
pub struct IdleReaper {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl IdleReaper {
    /// Start the reaper with the default 60 s sweep interval.
    pub fn start(registry: Arc<SessionRegistry>, idle_timeout: Duration) -> Self {
        Self::start_with_interval(registry, idle_timeout, DEFAULT_SWEEP_INTERVAL)
    }

    /// Start the reaper with an explicit sweep interval, for tests that
    /// cannot wait a full minute between sweeps.
    pub fn start_with_interval(
        registry: Arc<SessionRegistry>,
        idle_timeout: Duration,
        sweep_interval: Duration,
    ) -> Self {
        let shutdown = Arc::new(Notify::new());
        let shutdown_signal = Arc::clone(&shutdown);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = time::sleep(sweep_interval) => {
                        sweep(&registry, idle_timeout).await;
                    }
                    _ = shutdown_signal.notified() => {
                        break;
                    }
                }
            }
        });

        IdleReaper { shutdown, handle }
    }

    /// Stop the sweep loop promptly, without waiting for an in-flight
    /// sweep to find another round of idle sessions.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.handle.await;
    }
}

async fn sweep(registry: &SessionRegistry, idle_timeout: Duration) {
    let idle_ids = registry.idle_session_ids(idle_timeout).await;
    for id in idle_ids {
        match registry.delete(&id).await {
            Ok(()) => info!(session_id = %id, "reaper: deleted idle session"),
            Err(e) => warn!(session_id = %id, error = %e, "reaper: failed to delete idle session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, MountConfig};
    use crate::container::mock::MockRuntime;
    use crate::registry::FixedIndex;
    use std::path::PathBuf;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            data_mount: MountConfig {
                host_path: PathBuf::from("/data/host"),
                container_path: PathBuf::from("/data"),
                read_only: true,
            },
            worker_mount: MountConfig {
                host_path: PathBuf::from("/worker/host"),
                container_path: PathBuf::from("/worker"),
                read_only: true,
            },
            worker_command: vec!["python3".into(), "worker.py".into()],
            image: "textgame:test".into(),
            max_sessions: 4,
            batch_window_ms: 50,
            idle_timeout_s: 1,
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }

    #[tokio::test]
    async fn sweep_deletes_sessions_past_the_idle_timeout() {
        let runtime = Arc::new(MockRuntime::always_ok("start", &["go north"]));
        let registry = Arc::new(SessionRegistry::new(
            test_config(),
            runtime,
            vec!["/data/host/game1/game.tw-pddl".to_string()],
            Arc::new(FixedIndex(0)),
        ));
        let view = registry.create_session(None, None).await.unwrap();

        // Nothing idle yet at timeout zero-adjacent.
        let idle = registry.idle_session_ids(Duration::from_secs(3600)).await;
        assert!(idle.is_empty());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        sweep(&registry, Duration::from_secs(1)).await;

        let err = registry.get(&view.session_id).await.unwrap_err();
        assert!(matches!(err, crate::errors::GatewayError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop_promptly() {
        let runtime = Arc::new(MockRuntime::always_ok("start", &["go north"]));
        let registry = Arc::new(SessionRegistry::new(
            test_config(),
            runtime,
            vec!["/data/host/game1/game.tw-pddl".to_string()],
            Arc::new(FixedIndex(0)),
        ));
        let reaper = IdleReaper::start_with_interval(
            Arc::clone(&registry),
            Duration::from_secs(1),
            Duration::from_secs(3600),
        );
        reaper.shutdown().await;
    }
}
