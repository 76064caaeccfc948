use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var read by binaries for the log filter.
pub const LOG_ENV: &str = "PRACTICE_LOG";

/// Install the global `fmt` subscriber filtered by `log_level`.
///
/// An unparsable filter falls back to `info`. Calling this twice panics
/// inside `tracing-subscriber`; binaries call it once at startup.
pub fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Filter from `PRACTICE_LOG`, or `info` when unset.
#[must_use]
pub fn level_from_env() -> String {
    std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string())
}
