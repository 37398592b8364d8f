//! `AuthSync` builder and facade.
//!
//! This is the entry point for applications. It ties the layers together:
//! gateway → controller → driver → store.

use std::sync::Arc;

use authsync_gateway::AuthGateway;
use authsync_session::{
    ObserverScope, SessionDriver, SessionStore, SignInController, SubscriptionHandle, SyncConfig,
};
use authsync_types::{Credentials, RequestToken, Session};

use crate::AuthSyncError;

/// Builder for configuring an [`AuthSync`].
///
/// # Example
///
/// ```rust,ignore
/// let (auth, driver) = AuthSync::builder()
///     .config(SyncConfig { sign_in_timeout_ms: 10_000, ..Default::default() })
///     .build(Arc::new(my_gateway))?;
/// tokio::spawn(driver.run());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthSyncBuilder {
    config: SyncConfig,
}

impl AuthSyncBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the synchronization config.
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Wires `gateway` into a fresh store and controller.
    ///
    /// Must be called inside a Tokio runtime; the runtime handle is kept for
    /// gateway calls. The returned [`SessionDriver`] must be run (or pumped)
    /// on the UI context for results to reach the store.
    pub fn build<G: AuthGateway>(
        self,
        gateway: Arc<G>,
    ) -> Result<(AuthSync<G>, SessionDriver<G>), AuthSyncError> {
        let store = SessionStore::new();
        let (controller, driver) = SignInController::new(gateway, store.clone(), self.config)?;
        tracing::info!(session = %store.current(), "authsync ready");
        Ok((AuthSync { store, controller }, driver))
    }
}

/// The presentation-facing surface: intents in, session out.
pub struct AuthSync<G: AuthGateway> {
    store: SessionStore,
    controller: SignInController<G>,
}

impl<G: AuthGateway> AuthSync<G> {
    /// Creates a new builder.
    pub fn builder() -> AuthSyncBuilder {
        AuthSyncBuilder::new()
    }

    /// Submits an identifier/secret pair. See
    /// [`SignInController::sign_in`].
    pub fn sign_in(&self, identifier: &str, secret: &str) -> RequestToken {
        self.controller.sign_in(Credentials::new(identifier, secret))
    }

    /// Signs out. See [`SignInController::sign_out`].
    pub fn sign_out(&self) -> RequestToken {
        self.controller.sign_out()
    }

    /// The current session snapshot.
    pub fn current(&self) -> Session {
        self.store.current()
    }

    /// Registers an observer. It is called right away with the current
    /// session.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionHandle
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.store.subscribe(observer)
    }

    /// Removes an observer; idempotent.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.store.unsubscribe(handle)
    }

    /// Creates a named observer scope over this session.
    pub fn scope(&self, name: &str) -> ObserverScope {
        ObserverScope::new(&self.store, name)
    }

    /// The underlying store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}
