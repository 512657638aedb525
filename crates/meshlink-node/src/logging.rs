//! Tracing subscriber configuration for meshlink nodes.
//!
//! Log levels follow these conventions:
//! - ERROR: Unrecoverable stack failures, handler registration failures
//! - WARN: Bootstrap start failures, link loss, unknown stack status codes
//! - INFO: Connect, bootstrap started, bootstrap ready, disconnect
//! - DEBUG: State transitions, retry arming, bootstrap address details
//! - TRACE: Dropped foreign or stale events

use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the tracing subscriber.
///
/// Log level can be controlled via the `RUST_LOG` environment variable and
/// falls back to `default_level` (normally `[logging] level`).
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .init();
}

/// Initialize the tracing subscriber with JSON output.
///
/// Activated by setting `RUST_LOG_FORMAT=json`.
pub fn init_json(default_level: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_level))
        .init();
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}
