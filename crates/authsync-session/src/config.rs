//! Session synchronization settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for [`SignInController`](crate::SignInController).
///
/// Every field has a default, so a partial JSON/TOML document only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Ask the gateway for an already signed-in identity when the
    /// controller is built, and start `Authenticated` if there is one.
    pub restore_on_start: bool,

    /// Register a listener for the provider's own state pushes (token
    /// expiry, remote sign-out).
    pub follow_provider_events: bool,

    /// How long a sign-in may take before it is reported as a network
    /// failure, in milliseconds. 0 waits forever.
    pub sign_in_timeout_ms: u64,

    /// How long the background sign-out waits for the provider before
    /// logging it as unacknowledged, in milliseconds. 0 waits forever.
    /// The local session is cleared immediately either way.
    pub sign_out_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            restore_on_start: true,
            follow_provider_events: true,
            sign_in_timeout_ms: 30_000,
            sign_out_timeout_ms: 5_000,
        }
    }
}

impl SyncConfig {
    /// Sign-in deadline, or `None` when disabled.
    pub fn sign_in_timeout(&self) -> Option<Duration> {
        (self.sign_in_timeout_ms > 0).then(|| Duration::from_millis(self.sign_in_timeout_ms))
    }

    /// Sign-out acknowledgment deadline, or `None` when disabled.
    pub fn sign_out_timeout(&self) -> Option<Duration> {
        (self.sign_out_timeout_ms > 0).then(|| Duration::from_millis(self.sign_out_timeout_ms))
    }
}
