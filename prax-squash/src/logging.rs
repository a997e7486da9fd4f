//! Structured logging setup.
//!
//! The library logs through `tracing` and stays silent unless asked:
//!
//! - `PRAX_DEBUG=true|1|yes` - enable debug logging
//! - `PRAX_LOG_LEVEL=trace|debug|info|warn|error` - set the level
//! - `PRAX_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! Installing a subscriber requires the `tracing-subscriber` feature.
//!
//! ```rust,no_run
//! prax_squash::logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

fn truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Whether `PRAX_DEBUG` requests debug logging.
pub fn is_debug_enabled() -> bool {
    env::var("PRAX_DEBUG").map(|v| truthy(&v)).unwrap_or(false)
}

/// Resolve a level from the raw `PRAX_DEBUG` and `PRAX_LOG_LEVEL` values.
pub fn resolve_level(debug: Option<&str>, level: Option<&str>) -> &'static str {
    let fallback = if debug.is_some_and(truthy) { "debug" } else { "warn" };
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Resolve a format from the raw `PRAX_LOG_FORMAT` value.
pub fn resolve_format(format: Option<&str>) -> &'static str {
    match format.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// The configured log level.
pub fn get_log_level() -> &'static str {
    resolve_level(
        env::var("PRAX_DEBUG").ok().as_deref(),
        env::var("PRAX_LOG_LEVEL").ok().as_deref(),
    )
}

/// The configured log format.
pub fn get_log_format() -> &'static str {
    resolve_format(env::var("PRAX_LOG_FORMAT").ok().as_deref())
}

/// Initialize logging from the environment. Later calls are no-ops.
pub fn init() {
    if !is_debug_enabled() && env::var("PRAX_LOG_LEVEL").is_err() {
        return;
    }
    install(get_log_level());
}

fn install(level: &'static str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!("prax_squash={},prax_squash_cli={}", level, level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact().with_writer(std::io::stderr))
                    .init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty().with_writer(std::io::stderr))
                    .init(),
            }

            tracing::info!(level = level, format = get_log_format(), "Logging initialized");
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = level;
    });
}
