//! Observability: structured logging setup and metrics.

pub mod metrics;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging. `RUST_LOG` overrides the configured level.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
