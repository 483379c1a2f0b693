pub mod expand;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A host↔container bind mount with an access mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    pub host_path: PathBuf,
    pub container_path: PathBuf,
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

impl MountConfig {
    /// Translate a host-side path under this mount to the path the
    /// container sees, by prefix substitution.
    ///
    /// A host path that does not fall under `host_path` is returned
    /// unchanged; the subsequent init exchange will then fail with a
    /// container-error, which is the intended surface.
    pub fn to_container_path(&self, host_path: &str) -> String {
        let host_prefix = self.host_path.to_string_lossy();
        match host_path.strip_prefix(host_prefix.as_ref()) {
            Some(suffix) => format!("{}{}", self.container_path.to_string_lossy(), suffix),
            None => host_path.to_string(),
        }
    }
}

fn default_read_only() -> bool {
    true
}

/// Full runtime configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind mount carrying the game-data directory into each container.
    pub data_mount: MountConfig,
    /// Bind mount carrying the worker program into each container.
    pub worker_mount: MountConfig,
    /// Path (host side) to the worker entry point invoked inside the container.
    pub worker_command: Vec<String>,
    /// Container image tag used to launch worker containers.
    pub image: String,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_batch_window_ms")]
    pub batch_window_ms: u64,
    #[serde(default = "default_idle_timeout_s")]
    pub idle_timeout_s: u64,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl GatewayConfig {
    /// Return a copy with `${env:...}` placeholders and `~` expanded in
    /// every path-ish field.
    pub fn expand(mut self) -> Self {
        self.data_mount.host_path =
            PathBuf::from(expand::expand_tilde(&expand::expand_env_placeholders(
                &self.data_mount.host_path.to_string_lossy(),
            )));
        self.worker_mount.host_path =
            PathBuf::from(expand::expand_tilde(&expand::expand_env_placeholders(
                &self.worker_mount.host_path.to_string_lossy(),
            )));
        self.image = expand::expand_env_placeholders(&self.image);
        self
    }
}

fn default_max_sessions() -> usize {
    8
}

fn default_batch_window_ms() -> u64 {
    50
}

fn default_idle_timeout_s() -> u64 {
    600
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(host: &str, container: &str) -> MountConfig {
        MountConfig {
            host_path: PathBuf::from(host),
            container_path: PathBuf::from(container),
            read_only: true,
        }
    }

    #[test]
    fn to_container_path_substitutes_prefix() {
        let m = mount("/data/host", "/data");
        assert_eq!(
            m.to_container_path("/data/host/game42/game.tw-pddl"),
            "/data/game42/game.tw-pddl"
        );
    }

    #[test]
    fn to_container_path_passes_through_mismatched_prefix() {
        let m = mount("/data/host", "/data");
        assert_eq!(
            m.to_container_path("/elsewhere/game.tw-pddl"),
            "/elsewhere/game.tw-pddl"
        );
    }

    #[test]
    fn defaults_match_reference_values() {
        let json = serde_json::json!({
            "data_mount": {"host_path": "/d", "container_path": "/data"},
            "worker_mount": {"host_path": "/w", "container_path": "/worker"},
            "worker_command": ["python3", "-u", "worker.py"],
            "image": "textgame:latest",
        });
        let cfg: GatewayConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.max_sessions, 8);
        assert_eq!(cfg.batch_window_ms, 50);
        assert_eq!(cfg.idle_timeout_s, 600);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8000);
        assert!(cfg.data_mount.read_only);
    }

    #[test]
    fn expand_replaces_placeholders_in_paths() {
        std::env::set_var("GATEWAY_TEST_DATA_DIR", "/srv/games");
        let cfg = GatewayConfig {
            data_mount: mount("${env:GATEWAY_TEST_DATA_DIR}", "/data"),
            worker_mount: mount("/w", "/worker"),
            worker_command: vec!["worker".into()],
            image: "textgame:${env:GATEWAY_TEST_TAG}".into(),
            max_sessions: 8,
            batch_window_ms: 50,
            idle_timeout_s: 600,
            host: "0.0.0.0".into(),
            port: 8000,
        };
        std::env::set_var("GATEWAY_TEST_TAG", "v2");
        let expanded = cfg.expand();
        assert_eq!(expanded.data_mount.host_path, PathBuf::from("/srv/games"));
        assert_eq!(expanded.image, "textgame:v2");
        std::env::remove_var("GATEWAY_TEST_DATA_DIR");
        std::env::remove_var("GATEWAY_TEST_TAG");
    }
}
