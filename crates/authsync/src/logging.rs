//! Tracing subscriber setup for applications.

use tracing_subscriber::EnvFilter;

use crate::AuthSyncError;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used (for
/// example `"info"` or `"authsync_session=debug,info"`).
///
/// # Errors
/// Returns [`AuthSyncError::Logging`] if the filter does not parse or a
/// global subscriber is already installed.
pub fn init_logging(default_filter: &str) -> Result<(), AuthSyncError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| AuthSyncError::Logging(e.to_string()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| AuthSyncError::Logging(e.to_string()))
}
