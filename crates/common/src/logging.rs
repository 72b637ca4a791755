//! Logging utilities for the stream watchdog components.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the filter: `RUST_LOG` wins, otherwise `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize tracing with human-readable output.
///
/// Uses the RUST_LOG environment variable to control log levels and falls
/// back to `default_level` (usually "info").
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter(default_level))
        .init();
}

/// Initialize tracing with JSON formatting (useful for structured logging).
pub fn init_json(default_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(env_filter(default_level))
        .init();
}

/// Initialize tracing for the named format ("json" or anything else for text).
pub fn init_with_format(format: Option<&str>, default_level: &str) {
    match format {
        Some(f) if f.eq_ignore_ascii_case("json") => init_json(default_level),
        _ => init(default_level),
    }
}
