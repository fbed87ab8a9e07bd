//! Tracing initialization helpers.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes global tracing with an env-filter (`RUST_LOG`) and a
/// compact human-readable format.
///
/// Returns quietly if a global subscriber is already installed, so tests
/// and embedding applications can call it freely.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Initializes global tracing with JSON output, for deployments that
/// ship logs to a collector.
pub fn init_json_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).json().try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
