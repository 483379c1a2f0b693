//! Command-line flags (with environment-variable fallback) assembled
//! into a [`gateway_core::GatewayConfig`].

use anyhow::{bail, Context, Result};
use clap::Parser;
use gateway_core::config::{GatewayConfig, MountConfig};

#[derive(Parser, Debug)]
#[command(
    name = "gateway-server",
    about = "HTTP gateway fronting isolated text-game worker containers"
)]
pub struct Cli {
    /// Host directory containing the worker entry point, mounted read-only
    /// into each container.
    #[arg(long, env = "GATEWAY_WORKER_DIR")]
    pub worker_dir: String,

    /// Container image used to launch worker containers.
    #[arg(long, env = "GATEWAY_DOCKER_IMAGE", default_value = "textgame-worker:latest")]
    pub docker_image: String,

    /// Game-data volume as `host[:container[:mode]]`, e.g.
    /// `~/.cache/textgame:/data:ro`.
    #[arg(long, env = "GATEWAY_DATA_VOLUME", default_value = "~/.cache/textgame:/data:ro")]
    pub data_volume: String,

    /// Command run inside the container to start the worker.
    #[arg(
        long,
        env = "GATEWAY_WORKER_COMMAND",
        value_delimiter = ' ',
        default_value = "python3 -u worker.py"
    )]
    pub worker_command: Vec<String>,

    #[arg(long, env = "GATEWAY_MAX_SESSIONS", default_value_t = 8)]
    pub max_sessions: usize,

    #[arg(long, env = "GATEWAY_BATCH_WINDOW_MS", default_value_t = 50)]
    pub batch_window_ms: u64,

    #[arg(long = "idle-timeout", env = "GATEWAY_IDLE_TIMEOUT", default_value_t = 600)]
    pub idle_timeout_s: u64,

    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "GATEWAY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Log filter directives, e.g. `info` or `gateway_core=debug,tower_http=warn`.
    #[arg(long, env = "GATEWAY_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Cli {
    pub fn into_config(self) -> Result<GatewayConfig> {
        let (host_path, container_path, mode) = parse_data_volume(&self.data_volume)?;

        let config = GatewayConfig {
            data_mount: MountConfig {
                host_path: host_path.into(),
                container_path: container_path.into(),
                read_only: mode != "rw",
            },
            worker_mount: MountConfig {
                host_path: self.worker_dir.into(),
                container_path: "/worker".into(),
                read_only: true,
            },
            worker_command: self.worker_command,
            image: self.docker_image,
            max_sessions: self.max_sessions,
            batch_window_ms: self.batch_window_ms,
            idle_timeout_s: self.idle_timeout_s,
            host: self.host,
            port: self.port,
        };

        Ok(config.expand())
    }
}

fn parse_data_volume(spec: &str) -> Result<(String, String, String)> {
    let parts: Vec<&str> = spec.split(':').collect();
    let host = parts
        .first()
        .filter(|s| !s.is_empty())
        .context("--data-volume must specify a host path")?
        .to_string();
    if host.is_empty() {
        bail!("--data-volume must specify a host path");
    }
    let container = parts.get(1).copied().unwrap_or("/data").to_string();
    let mode = parts.get(2).copied().unwrap_or("ro").to_string();
    Ok((host, container, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_host_container_mode() {
        let (host, container, mode) = parse_data_volume("~/.cache/games:/data:rw").unwrap();
        assert_eq!(host, "~/.cache/games");
        assert_eq!(container, "/data");
        assert_eq!(mode, "rw");
    }

    #[test]
    fn defaults_container_and_mode_when_omitted() {
        let (host, container, mode) = parse_data_volume("/srv/games").unwrap();
        assert_eq!(host, "/srv/games");
        assert_eq!(container, "/data");
        assert_eq!(mode, "ro");
    }

    #[test]
    fn rejects_empty_host_path() {
        assert!(parse_data_volume(":/data:ro").is_err());
    }
}
