//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout stays free for command output. `RUST_LOG`
//! takes precedence over the configured filter.

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else `fallback`, else `info`.
#[must_use]
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one is left in place.
pub fn init(fallback: &str) -> bool {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter(fallback))
        .try_init()
        .is_ok()
}
