//! Sign-in control: turns user intents into gateway calls.
//!
//! # Latest request wins
//!
//! Every `sign_in` and `sign_out` takes the next value of a shared counter
//! as its [`RequestToken`]. A gateway completion carries the token of the
//! request that started it, and the [`SessionDriver`] drops it unless that
//! token is still the latest one. Submitting twice never runs the first
//! result over the second, and signing out makes any in-flight sign-in
//! result stale.
//!
//! Providers also push their own "signed in" notification when a sign-in
//! succeeds, and that push carries no token. The controller counts sign-in
//! calls whose result has not reached the driver yet, stale ones included,
//! and the driver ignores signed-in pushes while that count is non-zero.
//! Every spawned call reports exactly once, even if the gateway panics, so
//! the count always returns to zero.
//!
//! # Threads
//!
//! `sign_in` and `sign_out` never block. They may be called from a thread
//! that is not part of the Tokio runtime (a native UI thread): gateway calls
//! are spawned on the runtime handle captured at construction, and their
//! results travel back over a channel to the driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use authsync_gateway::{AuthError, AuthGateway, StateListener};
use authsync_types::{Credentials, Identity, RequestToken, Session};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::driver::UiEvent;
use crate::{SessionDriver, SessionError, SessionStore, SyncConfig};

/// Accepts credential submissions and sign-outs, and drives the store.
pub struct SignInController<G: AuthGateway> {
    gateway: Arc<G>,
    store: SessionStore,
    /// Last issued token; shared with the driver for the staleness check.
    latest: Arc<AtomicU64>,
    /// Sign-in calls not yet reported to the driver.
    in_flight: Arc<AtomicUsize>,
    events: mpsc::UnboundedSender<UiEvent>,
    runtime: Handle,
    config: SyncConfig,
}

impl<G: AuthGateway> SignInController<G> {
    /// Builds a controller and the driver that applies its results.
    ///
    /// With `restore_on_start`, queries the gateway's current identity once
    /// and starts `Authenticated` if there is one. With
    /// `follow_provider_events`, registers a provider listener that the
    /// driver removes when it is dropped.
    ///
    /// # Errors
    /// Returns [`SessionError::NoRuntime`] when called outside a Tokio
    /// runtime.
    pub fn new(
        gateway: Arc<G>,
        store: SessionStore,
        config: SyncConfig,
    ) -> Result<(Self, SessionDriver<G>), SessionError> {
        let runtime = Handle::try_current().map_err(|e| SessionError::NoRuntime(e.to_string()))?;
        let (events, receiver) = mpsc::unbounded_channel();

        if config.restore_on_start {
            if let Some(identity) = gateway.current_identity() {
                tracing::info!(%identity, "restored provider session");
                store.apply(Session::Authenticated { identity });
            }
        }

        let listener = if config.follow_provider_events {
            // Weak, so a registered listener alone doesn't keep the
            // driver's channel open.
            let weak = events.downgrade();
            let forward: StateListener = Arc::new(move |identity: Option<Identity>| {
                if let Some(events) = weak.upgrade() {
                    let _ = events.send(UiEvent::ProviderChanged(identity));
                }
            });
            Some(gateway.add_state_listener(forward))
        } else {
            None
        };

        let latest = Arc::new(AtomicU64::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let driver = SessionDriver::new(
            store.clone(),
            receiver,
            Arc::clone(&latest),
            Arc::clone(&in_flight),
            Arc::clone(&gateway),
            listener,
        );

        let controller = Self {
            gateway,
            store,
            latest,
            in_flight,
            events,
            runtime,
            config,
        };
        Ok((controller, driver))
    }

    /// Submits `credentials` to the gateway.
    ///
    /// Moves the session to `Authenticating` right away. The outcome arrives
    /// later through the driver: `Authenticated` on success, `Failed` with
    /// the error kind otherwise, unless a newer request was issued in the
    /// meantime. Failures are never retried automatically.
    pub fn sign_in(&self, credentials: Credentials) -> RequestToken {
        let token = self.next_token();
        tracing::info!(%token, identifier = %credentials.identifier, "sign-in requested");
        self.store.apply(Session::Authenticating);

        // Counted before the call starts, so any push it causes finds the
        // count raised.
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let report = SignInReport {
            token,
            events: self.events.clone(),
            sent: false,
        };

        let gateway = Arc::clone(&self.gateway);
        let timeout = self.config.sign_in_timeout();
        self.runtime.spawn(async move {
            let attempt = gateway.sign_in(&credentials);
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(AuthError::Network(format!(
                        "sign-in timed out after {}ms",
                        limit.as_millis()
                    ))),
                },
                None => attempt.await,
            };
            report.send(result);
        });

        token
    }

    /// Signs out.
    ///
    /// Starts the gateway sign-out, then moves the session to
    /// `Unauthenticated` without waiting for the provider to acknowledge.
    /// Any sign-in still in flight becomes stale. Calling this while
    /// already signed out produces no notification.
    pub fn sign_out(&self) -> RequestToken {
        let token = self.next_token();
        tracing::info!(%token, "sign-out requested");

        let gateway = Arc::clone(&self.gateway);
        let timeout = self.config.sign_out_timeout();
        self.runtime.spawn(async move {
            let attempt = gateway.sign_out();
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, attempt).await.ok(),
                None => Some(attempt.await),
            };
            match outcome {
                Some(Ok(())) => tracing::debug!(%token, "provider acknowledged sign-out"),
                Some(Err(e)) => tracing::warn!(
                    %token,
                    error = %e,
                    "provider sign-out failed, session cleared locally"
                ),
                None => tracing::warn!(%token, "provider did not acknowledge sign-out in time"),
            }
        });

        self.store.apply(Session::Unauthenticated);
        token
    }

    /// Convenience for `sign_in(Credentials::new(identifier, secret))`.
    pub fn sign_in_with(&self, identifier: &str, secret: &str) -> RequestToken {
        self.sign_in(Credentials::new(identifier, secret))
    }

    /// The store this controller drives.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The most recently issued request token, if any.
    pub fn latest_token(&self) -> Option<RequestToken> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }

    fn next_token(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Carries one sign-in result to the driver.
///
/// Dropped without [`send`](Self::send) (the gateway panicked, or the
/// runtime shut down before the call finished), it reports the request as
/// failed instead, so the driver's in-flight count stays balanced.
struct SignInReport {
    token: RequestToken,
    events: mpsc::UnboundedSender<UiEvent>,
    sent: bool,
}

impl SignInReport {
    fn send(mut self, result: Result<Identity, AuthError>) {
        self.sent = true;
        self.deliver(result);
    }

    fn deliver(&self, result: Result<Identity, AuthError>) {
        let token = self.token;
        if self
            .events
            .send(UiEvent::SignInCompleted { token, result })
            .is_err()
        {
            tracing::debug!(%token, "driver gone, sign-in result dropped");
        }
    }
}

impl Drop for SignInReport {
    fn drop(&mut self) {
        if self.sent {
            return;
        }
        tracing::warn!(token = %self.token, "sign-in call ended without a result");
        self.deliver(Err(AuthError::Unknown(
            "sign-in call ended without a result".into(),
        )));
    }
}
