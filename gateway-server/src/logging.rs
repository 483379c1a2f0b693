//! Installs the process-wide `tracing` subscriber.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install a single global subscriber. `default_filter` is used when the
/// `RUST_LOG` environment variable is unset, so `--log` controls
/// verbosity without requiring operators to know the env-filter syntax.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
