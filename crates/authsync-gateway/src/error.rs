//! Error types reported by identity providers.

use std::io;

use authsync_types::AuthErrorKind;

/// A failed provider call.
///
/// Gateways translate whatever their provider returns into one of these
/// variants. The session layer keeps only the [`kind`](Self::kind); the
/// detail strings end up in the logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The provider rejected the identifier/secret pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request failed in transit (offline, timed out, connection reset).
    #[error("network error: {0}")]
    Network(String),

    /// The provider is reachable but not serving requests.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The gateway could not classify the failure.
    #[error("unknown authentication error: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Maps this error onto the closed taxonomy stored in a failed session.
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::InvalidCredentials => AuthErrorKind::InvalidCredentials,
            Self::Network(_) => AuthErrorKind::NetworkError,
            Self::ProviderUnavailable(_) => AuthErrorKind::ProviderUnavailable,
            Self::Unknown(_) => AuthErrorKind::Unknown,
        }
    }
}

impl From<AuthError> for AuthErrorKind {
    fn from(err: AuthError) -> Self {
        err.kind()
    }
}

/// I/O failures from a network-backed gateway.
///
/// Transport-shaped errors become [`AuthError::Network`]; everything else
/// is [`AuthError::Unknown`].
impl From<io::Error> for AuthError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
            | io::ErrorKind::UnexpectedEof => Self::Network(err.to_string()),
            _ => Self::Unknown(err.to_string()),
        }
    }
}
