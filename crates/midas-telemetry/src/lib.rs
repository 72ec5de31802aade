//! Process-wide `tracing` setup. Compact, colored output in debug builds;
//! flattened JSON lines in release, so log aggregators can parse them
//! without a custom grok pattern.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global subscriber for `service_name`. Panics if a
/// subscriber is already installed. Call this exactly once, from `main`.
pub fn init_tracing(service_name: &str) {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{service_name}={default_level},tower_http=warn,libsql=warn").into()
    });

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    }
}
