//! # Logging
//!
//! Installs the global tracing subscriber.
//!
//! `RUST_LOG` takes precedence. Otherwise the controller logs at `LOG_LEVEL`
//! and everything else at `warn`. `LOG_FORMAT=json` switches to one JSON object
//! per line for log shippers; anything else gives human readable text.

use tracing_subscriber::EnvFilter;

/// Default filter directive for a given controller log level
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    let level = match log_level.to_ascii_lowercase().as_str() {
        level @ ("error" | "warn" | "info" | "debug" | "trace") => level.to_string(),
        _ => "info".to_string(),
    };
    format!("warn,secret_generator_controller={level}")
}

/// Initialize the global tracing subscriber
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(
    log_level: &str,
    log_format: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_level)));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    }
}
