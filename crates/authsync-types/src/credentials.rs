//! Sign-in input.

use std::fmt;

/// An identifier/secret pair submitted by the user.
///
/// Lives only for the duration of one sign-in call. It is deliberately not
/// `Serialize`, and its `Debug` output never prints the secret, so it can't
/// end up in logs or on disk by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account identifier (usually an email address).
    pub identifier: String,
    /// The secret (password). Never logged.
    pub secret: String,
}

impl Credentials {
    /// Creates a credential pair. No validation happens here; that is the
    /// gateway's job.
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}
