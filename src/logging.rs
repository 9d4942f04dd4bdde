//! Logging setup: `tracing` + `tracing-subscriber`, headless only — this
//! crate has no TUI layer to route spans through.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber. `RUST_LOG` wins if set;
/// otherwise falls back to `default_filter` (typically derived from
/// `EngineConfig::test_mode`, which prefers a quieter default).
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Default filter for the CLI binary outside of tests.
pub fn default_filter() -> &'static str {
    "info,browserstore=debug"
}
