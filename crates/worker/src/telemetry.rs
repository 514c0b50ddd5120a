//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, WorkerConfig};

/// Install the global subscriber. `RUST_LOG` wins over `LOG_LEVEL`.
pub fn init_tracing(config: &WorkerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Apply `level` to the workspace crates and keep dependencies at `warn`
/// unless a more verbose level was asked for.
fn default_directive(level: &str) -> String {
    let deps = match level {
        "trace" | "debug" => level,
        _ => "warn",
    };
    format!("{deps},relay_worker={level},relay_actions={level},relay_db={level},relay_core={level}")
}
