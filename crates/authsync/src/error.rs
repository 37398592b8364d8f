//! Unified error type for authsync.

use authsync_gateway::AuthError;
use authsync_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// Each variant has a `#[from]` conversion, so `?` lifts sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthSyncError {
    /// A session-layer error (scope misuse, missing runtime).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A gateway error from application code that calls its provider
    /// directly (a health check, an account switcher) and wants `?` into
    /// this type. The facade never returns it: sign-in failures become
    /// `Session::Failed` instead.
    #[error(transparent)]
    Gateway(#[from] AuthError),

    /// The global tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}
