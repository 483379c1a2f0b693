//! C3: the session map, admission control, and the session lifecycle
//! (create / attach / init / lookup / delete).

use crate::config::GatewayConfig;
use crate::container::{BindMount, ContainerRuntime, ContainerSpec};
use crate::errors::{GatewayError, GatewayResult};
use crate::session::{Session, SessionMeta, SessionStatus, SessionView};
use crate::task_type::TaskType;
use crate::worker_channel::WorkerChannel;
use crate::worker_protocol::WorkerRequest;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};
use uuid::Uuid;

/// An injectable source of randomness for game-file selection, so tests
/// can make the otherwise-random pick deterministic.
pub trait RandomSource: Send + Sync {
    /// Return an index in `0..len`. Never called with `len == 0`.
    fn pick_index(&self, len: usize) -> usize;
}

/// The production random source.
pub struct ThreadRng;

impl RandomSource for ThreadRng {
    fn pick_index(&self, len: usize) -> usize {
        use rand::Rng;
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always returns a fixed index (clamped to the pool), for deterministic
/// tests.
pub struct FixedIndex(pub usize);

impl RandomSource for FixedIndex {
    fn pick_index(&self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

pub struct SessionRegistry {
    config: GatewayConfig,
    runtime: Arc<dyn ContainerRuntime>,
    game_files: Vec<String>,
    random: Arc<dyn RandomSource>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    admission: Arc<Semaphore>,
}

impl SessionRegistry {
    pub fn new(
        config: GatewayConfig,
        runtime: Arc<dyn ContainerRuntime>,
        game_files: Vec<String>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let admission = Arc::new(Semaphore::new(config.max_sessions));
        SessionRegistry {
            config,
            runtime,
            game_files,
            random,
            sessions: Mutex::new(HashMap::new()),
            admission,
        }
    }

    pub fn game_files(&self) -> &[String] {
        &self.game_files
    }

    pub fn max_sessions(&self) -> usize {
        self.config.max_sessions
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn select_game_file(
        &self,
        requested: Option<String>,
        task_type: Option<TaskType>,
    ) -> GatewayResult<String> {
        if let Some(path) = requested {
            return Ok(path);
        }
        if self.game_files.is_empty() {
            return Err(GatewayError::ContainerError(
                "no game files discovered".into(),
            ));
        }
        let pool: Vec<&String> = match task_type {
            Some(t) => {
                let filtered: Vec<&String> = self
                    .game_files
                    .iter()
                    .filter(|p| p.contains(t.label()))
                    .collect();
                if filtered.is_empty() {
                    self.game_files.iter().collect()
                } else {
                    filtered
                }
            }
            None => self.game_files.iter().collect(),
        };
        let idx = self.random.pick_index(pool.len());
        Ok(pool[idx].clone())
    }

    /// Start a container, attach to it, insert the session, then run the
    /// init round-trip — or roll back every partial step on failure,
    /// including removing the session from the map.
    pub async fn create_session(
        &self,
        game_file: Option<String>,
        task_type: Option<TaskType>,
    ) -> GatewayResult<SessionView> {
        let permit = Arc::clone(&self.admission)
            .try_acquire_owned()
            .map_err(|_| GatewayError::NoSlots(self.config.max_sessions))?;

        let host_game_file = self.select_game_file(game_file, task_type)?;
        let container_game_file = self.config.data_mount.to_container_path(&host_game_file);

        let id = Uuid::new_v4().to_string();
        let spec = ContainerSpec {
            image: self.config.image.clone(),
            command: self.config.worker_command.clone(),
            session_id: id.clone(),
            mounts: vec![
                BindMount {
                    host_path: self.config.data_mount.host_path.to_string_lossy().into_owned(),
                    container_path: self
                        .config
                        .data_mount
                        .container_path
                        .to_string_lossy()
                        .into_owned(),
                    read_only: self.config.data_mount.read_only,
                },
                BindMount {
                    host_path: self.config.worker_mount.host_path.to_string_lossy().into_owned(),
                    container_path: self
                        .config
                        .worker_mount
                        .container_path
                        .to_string_lossy()
                        .into_owned(),
                    read_only: self.config.worker_mount.read_only,
                },
            ],
        };

        let handle = self.runtime.run(spec).await?;

        let stream = match self.runtime.attach(&handle).await {
            Ok(s) => s,
            Err(e) => {
                let _ = self.runtime.kill(&handle).await;
                return Err(e);
            }
        };

        let channel = WorkerChannel::new(stream);
        let now = Utc::now();
        let session = Arc::new(Session {
            id: id.clone(),
            created_at: now,
            container: handle,
            channel,
            permit,
            meta: Mutex::new(SessionMeta {
                game_file: host_game_file,
                observation: String::new(),
                admissible_commands: Vec::new(),
                status: SessionStatus::Active,
                last_active_at: now,
            }),
        });
        {
            let mut sessions = self.sessions.lock().await;
            sessions.insert(id.clone(), Arc::clone(&session));
        }

        let init = session
            .channel
            .exchange(&WorkerRequest::Init {
                game_file: container_game_file,
            })
            .await;
        let init = match init {
            Ok(resp) => resp,
            Err(e) => {
                self.discard_failed_session(&id, &session).await;
                return Err(e);
            }
        };
        if !init.is_ok() {
            self.discard_failed_session(&id, &session).await;
            return Err(GatewayError::ContainerError(
                init.message.unwrap_or_else(|| "worker init failed".into()),
            ));
        }

        {
            let mut meta = session.meta.lock().await;
            meta.observation = init.observation.unwrap_or_default();
            meta.admissible_commands = init.admissible_commands.unwrap_or_default();
        }

        let view = session.view().await;
        info!(session_id = %id, "session created");
        Ok(view)
    }

    /// Remove a session that failed its init round-trip from the map and
    /// kill its container, so a failed create never leaves a half-live
    /// entry behind.
    async fn discard_failed_session(&self, id: &str, session: &Arc<Session>) {
        self.sessions.lock().await.remove(id);
        let _ = self.runtime.kill(&session.container).await;
    }

    pub async fn get(&self, id: &str) -> GatewayResult<SessionView> {
        let session = self.lookup(id).await?;
        Ok(session.view().await)
    }

    /// Return the session handle without holding the registry lock past
    /// the lookup itself, so callers can perform I/O against the
    /// session's own channel lock instead.
    pub async fn lookup(&self, id: &str) -> GatewayResult<Arc<Session>> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::SessionNotFound(id.to_string()))
    }

    pub async fn delete(&self, id: &str) -> GatewayResult<()> {
        let removed = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(id)
        };
        let session = removed.ok_or_else(|| GatewayError::SessionNotFound(id.to_string()))?;
        if let Err(e) = self.runtime.kill(&session.container).await {
            warn!(session_id = %id, error = %e, "kill failed during delete; container may already be gone");
        }
        info!(session_id = %id, "session deleted");
        Ok(())
    }

    /// Ids of sessions whose `last_active_at` is at least `idle_timeout`
    /// in the past, for the idle reaper's sweep.
    pub async fn idle_session_ids(&self, idle_timeout: Duration) -> Vec<String> {
        let sessions = self.sessions.lock().await;
        let mut idle = Vec::new();
        for (id, session) in sessions.iter() {
            let last_active = session.last_active_at().await;
            let age = Utc::now().signed_duration_since(last_active);
            if age.num_seconds() >= idle_timeout.as_secs() as i64 {
                idle.push(id.clone());
            }
        }
        idle
    }

    /// Delete every current session, ignoring individual failures, and
    /// return the ids actually removed.
    pub async fn delete_all(&self) -> Vec<String> {
        let ids: Vec<String> = {
            let sessions = self.sessions.lock().await;
            sessions.keys().cloned().collect()
        };
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.delete(&id).await {
                Ok(()) => removed.push(id),
                Err(e) => warn!(session_id = %id, error = %e, "delete_all: failed to remove session"),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MountConfig;
    use crate::container::mock::MockRuntime;
    use std::path::PathBuf;

    fn test_config(max_sessions: usize) -> GatewayConfig {
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
            max_sessions,
            batch_window_ms: 50,
            idle_timeout_s: 600,
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }

    fn registry(max_sessions: usize) -> SessionRegistry {
        let runtime = Arc::new(MockRuntime::always_ok("start", &["go north"]));
        SessionRegistry::new(
            test_config(max_sessions),
            runtime,
            vec!["/data/host/game1/game.tw-pddl".to_string()],
            Arc::new(FixedIndex(0)),
        )
    }

    #[tokio::test]
    async fn create_then_get_then_delete_round_trips() {
        let reg = registry(4);
        let view = reg.create_session(None, None).await.unwrap();
        assert_eq!(view.status, SessionStatus::Active);
        assert!(!view.observation.is_empty());

        let fetched = reg.get(&view.session_id).await.unwrap();
        assert_eq!(fetched.session_id, view.session_id);

        reg.delete(&view.session_id).await.unwrap();
        let err = reg.get(&view.session_id).await.unwrap_err();
        assert!(matches!(err, GatewayError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn capacity_exhaustion_yields_no_slots() {
        let reg = registry(1);
        let first = reg.create_session(None, None).await;
        assert!(first.is_ok());
        let second = reg.create_session(None, None).await;
        assert!(matches!(second, Err(GatewayError::NoSlots(1))));
    }

    #[tokio::test]
    async fn delete_releases_the_permit_for_reuse() {
        let reg = registry(1);
        let first = reg.create_session(None, None).await.unwrap();
        reg.delete(&first.session_id).await.unwrap();
        let second = reg.create_session(None, None).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let reg = registry(2);
        let view = reg.create_session(None, None).await.unwrap();
        reg.delete(&view.session_id).await.unwrap();
        let err = reg.delete(&view.session_id).await.unwrap_err();
        assert!(matches!(err, GatewayError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn delete_all_removes_every_session() {
        let reg = registry(3);
        for _ in 0..3 {
            reg.create_session(None, None).await.unwrap();
        }
        let removed = reg.delete_all().await;
        assert_eq!(removed.len(), 3);
        assert_eq!(reg.active_count().await, 0);
    }

    #[tokio::test]
    async fn explicit_game_file_bypasses_selection() {
        let reg = registry(2);
        let view = reg
            .create_session(Some("/data/host/custom/game.tw-pddl".to_string()), None)
            .await
            .unwrap();
        assert_eq!(view.game_file, "/data/host/custom/game.tw-pddl");
    }
}
