//! Core session types.
//!
//! A [`Session`] is a value: it is never edited in place, only replaced by
//! the session store. Two sessions that compare equal are the same state,
//! which is what lets the store skip redundant notifications.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The account identifier reported by the identity provider.
///
/// Newtype over `String` so a raw credential identifier can't be passed
/// where a verified identity is expected. Serialized as the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Creates an identity from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RequestToken
// ---------------------------------------------------------------------------

/// Monotonically increasing id issued for every sign-in or sign-out request.
///
/// Only the result of the most recently issued request may change the
/// session. A completion carrying an older token is stale and is dropped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AuthErrorKind
// ---------------------------------------------------------------------------

/// Why a sign-in failed.
///
/// Every gateway failure is mapped into one of these four kinds before it
/// reaches the session store. The kind is all the session keeps; detailed
/// provider messages stay in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    /// The provider rejected the identifier/secret pair.
    InvalidCredentials,
    /// The request never got a usable answer (offline, timeout, reset).
    NetworkError,
    /// The provider answered but refused service (outage, maintenance).
    ProviderUnavailable,
    /// Anything the gateway could not classify.
    Unknown,
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidCredentials => "invalid credentials",
            Self::NetworkError => "network error",
            Self::ProviderUnavailable => "provider unavailable",
            Self::Unknown => "unknown error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The four states of the sign-in state machine.
///
/// ```text
///   Unauthenticated ──sign_in──→ Authenticating ──ok──→ Authenticated
///         ↑                            │                      │
///         │                            └──err──→ Failed       │
///         │                                        │          │
///         └──────────────sign_out──────────────────┴──────────┘
/// ```
///
/// `Failed` also goes back to `Authenticating` on the next sign-in.
/// There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Failed,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authoritative record of whether, and as whom, the user is signed in.
///
/// The identity only exists in the `Authenticated` variant and the error
/// kind only exists in the `Failed` variant, so a session can never carry
/// both (or carry one in the wrong state).
///
/// Serialized with an internal `status` tag:
///
/// ```json
/// { "status": "authenticated", "identity": "a@b.com" }
/// { "status": "failed", "error": "invalid_credentials" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Session {
    /// Nobody is signed in.
    #[default]
    Unauthenticated,
    /// A sign-in request is in flight.
    Authenticating,
    /// Signed in as `identity`.
    Authenticated { identity: Identity },
    /// The last sign-in attempt failed.
    Failed { error: AuthErrorKind },
}

impl Session {
    /// Shorthand for `Session::Authenticated { identity }`.
    pub fn authenticated(identity: impl Into<String>) -> Self {
        Self::Authenticated {
            identity: Identity::new(identity),
        }
    }

    /// Shorthand for `Session::Failed { error }`.
    pub fn failed(error: AuthErrorKind) -> Self {
        Self::Failed { error }
    }

    /// The flat status of this session.
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Unauthenticated => SessionStatus::Unauthenticated,
            Self::Authenticating => SessionStatus::Authenticating,
            Self::Authenticated { .. } => SessionStatus::Authenticated,
            Self::Failed { .. } => SessionStatus::Failed,
        }
    }

    /// The signed-in identity, present only when authenticated.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated { identity } => Some(identity),
            _ => None,
        }
    }

    /// The failure kind, present only when failed.
    pub fn error(&self) -> Option<AuthErrorKind> {
        match self {
            Self::Failed { error } => Some(*error),
            _ => None,
        }
    }

    /// `true` when the session is `Authenticated`.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::Authenticating => f.write_str("authenticating"),
            Self::Authenticated { identity } => write!(f, "authenticated as {identity}"),
            Self::Failed { error } => write!(f, "failed ({error})"),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
