mod cli;
mod http;
mod logging;

use clap::Parser;
use gateway_core::container::docker::DockerRuntime;
use gateway_core::container::ContainerRuntime;
use gateway_core::{gamefiles, BatchCoordinator, IdleReaper, SessionRegistry, ThreadRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init(&cli.log_filter);

    let config = cli.into_config()?;
    info!(
        image = %config.image,
        max_sessions = config.max_sessions,
        batch_window_ms = config.batch_window_ms,
        idle_timeout_s = config.idle_timeout_s,
        "starting gateway"
    );

    let game_files = gamefiles::discover_game_files(&config.data_mount.host_path);
    info!(count = game_files.len(), "discovered game files");

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect()?);
    let registry = Arc::new(SessionRegistry::new(
        config.clone(),
        runtime,
        game_files,
        Arc::new(ThreadRng),
    ));
    let batch = BatchCoordinator::new(
        Arc::clone(&registry),
        Duration::from_millis(config.batch_window_ms),
    );
    let reaper = IdleReaper::start(
        Arc::clone(&registry),
        Duration::from_secs(config.idle_timeout_s),
    );

    let state = http::AppState {
        registry: Arc::clone(&registry),
        batch,
    };
    let app = http::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down: stopping reaper and draining sessions");
    reaper.shutdown().await;
    let removed = registry.delete_all().await;
    info!(count = removed.len(), "sessions deleted on shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
