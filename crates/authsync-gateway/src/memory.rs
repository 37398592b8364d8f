//! In-process identity provider.
//!
//! [`MemoryGateway`] behaves like a hosted provider from the outside: calls
//! take (simulated) time, a successful sign-in or a sign-out is pushed to
//! state listeners, and the provider can go offline or expire a session on
//! its own. Accounts live in a plain map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use authsync_types::{Credentials, Identity};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{AuthError, AuthGateway, ListenerHandle, StateListener};

/// Simulated network behavior for [`MemoryGateway`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryGatewayConfig {
    /// Base delay for every `sign_in`/`sign_out` call, in milliseconds.
    pub latency_ms: u64,
    /// Extra random delay (0..=jitter) added on top of `latency_ms`.
    pub jitter_ms: u64,
}

#[derive(Default)]
struct ProviderState {
    /// identifier → secret
    accounts: HashMap<String, String>,
    current: Option<Identity>,
    listeners: Vec<(ListenerHandle, StateListener)>,
    offline: bool,
    unavailable: bool,
}

/// A provider backed by an in-memory account table.
pub struct MemoryGateway {
    config: MemoryGatewayConfig,
    state: Mutex<ProviderState>,
    next_listener: AtomicU64,
}

impl MemoryGateway {
    /// Creates a provider with no accounts.
    pub fn new(config: MemoryGatewayConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ProviderState::default()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Builder-style [`add_account`](Self::add_account).
    pub fn with_account(self, identifier: &str, secret: &str) -> Self {
        self.add_account(identifier, secret);
        self
    }

    /// Registers (or replaces) an account.
    pub fn add_account(&self, identifier: &str, secret: &str) {
        self.state
            .lock()
            .accounts
            .insert(identifier.to_string(), secret.to_string());
    }

    /// Marks the provider as already signed in, as if a session survived
    /// from an earlier run. Does not notify listeners.
    pub fn restore_session(&self, identity: Identity) {
        self.state.lock().current = Some(identity);
    }

    /// Simulates losing connectivity: calls fail with [`AuthError::Network`].
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Simulates an outage: calls fail with [`AuthError::ProviderUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Ends the current session from the provider side (token expiry,
    /// remote revocation) and pushes `None` to listeners.
    ///
    /// Returns `false` if nobody was signed in.
    pub fn expire_session(&self) -> bool {
        let expired = self.state.lock().current.take();
        match expired {
            Some(identity) => {
                tracing::info!(%identity, "provider expired session");
                self.notify(None);
                true
            }
            None => false,
        }
    }

    /// Number of registered state listeners.
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    fn latency(&self) -> Duration {
        let jitter = if self.config.jitter_ms > 0 {
            rand::rng().random_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.config.latency_ms + jitter)
    }

    async fn simulate_network(&self) {
        let delay = self.latency();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_reachable(state: &ProviderState) -> Result<(), AuthError> {
        if state.offline {
            return Err(AuthError::Network("provider unreachable".into()));
        }
        if state.unavailable {
            return Err(AuthError::ProviderUnavailable("service outage".into()));
        }
        Ok(())
    }

    /// Calls every listener with `current`. The lock is released first so
    /// a listener may call back into the gateway.
    fn notify(&self, current: Option<Identity>) {
        let listeners: Vec<StateListener> = self
            .state
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| StateListener::clone(l))
            .collect();
        for listener in listeners {
            listener(current.clone());
        }
    }
}

impl AuthGateway for MemoryGateway {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        self.simulate_network().await;

        let changed = {
            let mut state = self.state.lock();
            Self::check_reachable(&state)?;

            let accepted = state
                .accounts
                .get(&credentials.identifier)
                .is_some_and(|secret| *secret == credentials.secret);
            if !accepted {
                tracing::debug!(identifier = %credentials.identifier, "credentials rejected");
                return Err(AuthError::InvalidCredentials);
            }

            let identity = Identity::new(credentials.identifier.clone());
            let changed = state.current.as_ref() != Some(&identity);
            state.current = Some(identity.clone());
            changed.then_some(identity)
        };

        match changed {
            Some(identity) => {
                self.notify(Some(identity.clone()));
                Ok(identity)
            }
            None => Ok(Identity::new(credentials.identifier.clone())),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.simulate_network().await;

        let was_signed_in = {
            let mut state = self.state.lock();
            Self::check_reachable(&state)?;
            state.current.take().is_some()
        };
        if was_signed_in {
            self.notify(None);
        }
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.state.lock().current.clone()
    }

    fn add_state_listener(&self, listener: StateListener) -> ListenerHandle {
        let handle = ListenerHandle::new(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.state.lock().listeners.push((handle, listener));
        tracing::debug!(%handle, "state listener added");
        handle
    }

    fn remove_state_listener(&self, handle: ListenerHandle) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(h, _)| *h != handle);
        let removed = state.listeners.len() != before;
        if removed {
            tracing::debug!(%handle, "state listener removed");
        }
        removed
    }
}
