//! Error types for the session layer.
//!
//! Gateway failures are not errors at this level: they become a `Failed`
//! session. These variants cover misuse of the session layer itself.

/// Errors returned by session-layer operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `enter` was called on a scope that already holds a live
    /// registration. Leave it first.
    #[error("observer scope {0:?} is already active")]
    ScopeActive(String),

    /// The controller was built outside a Tokio runtime, so there is
    /// nowhere to run gateway calls.
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(String),
}
