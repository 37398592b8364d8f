//! The session driver: the UI-affine end of the result channel.
//!
//! Gateway calls finish on runtime worker threads and providers push
//! notifications from wherever they like. None of them touch the store
//! directly. They send a [`UiEvent`] and the driver, running on the one
//! context allowed to mutate the session, applies it.
//!
//! Three ways to run it, depending on the host:
//!
//! - `run().await`: a dedicated task that lives as long as the controller
//! - `next_event().await`: one event at a time (tests, custom loops)
//! - `pump()`: drain whatever is queued, without waiting (frame-driven UIs)

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use authsync_gateway::{AuthError, AuthGateway, ListenerHandle};
use authsync_types::{Identity, RequestToken, Session, SessionStatus};
use tokio::sync::mpsc;

use crate::SessionStore;

/// Something that happened off the UI context and must be applied on it.
#[derive(Debug)]
pub(crate) enum UiEvent {
    /// A gateway sign-in finished.
    SignInCompleted {
        token: RequestToken,
        result: Result<Identity, AuthError>,
    },
    /// The provider pushed its view of the current identity.
    ProviderChanged(Option<Identity>),
}

/// Applies gateway results and provider pushes to the [`SessionStore`].
///
/// Created together with its controller by
/// [`SignInController::new`](crate::SignInController::new). Dropping it
/// removes the provider listener.
pub struct SessionDriver<G: AuthGateway> {
    store: SessionStore,
    events: mpsc::UnboundedReceiver<UiEvent>,
    latest: Arc<AtomicU64>,
    /// Sign-in calls the controller started whose result hasn't arrived.
    in_flight: Arc<AtomicUsize>,
    gateway: Arc<G>,
    listener: Option<ListenerHandle>,
}

impl<G: AuthGateway> SessionDriver<G> {
    pub(crate) fn new(
        store: SessionStore,
        events: mpsc::UnboundedReceiver<UiEvent>,
        latest: Arc<AtomicU64>,
        in_flight: Arc<AtomicUsize>,
        gateway: Arc<G>,
        listener: Option<ListenerHandle>,
    ) -> Self {
        Self {
            store,
            events,
            latest,
            in_flight,
            gateway,
            listener,
        }
    }

    /// Processes events until the controller and every in-flight request
    /// are gone.
    pub async fn run(mut self) {
        tracing::debug!("session driver started");
        while self.next_event().await {}
        tracing::debug!("session driver stopped");
    }

    /// Waits for one event and applies it.
    ///
    /// Returns `false` once the channel is closed.
    pub async fn next_event(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Applies every event already queued, without waiting. Returns how
    /// many were processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle(event);
            processed += 1;
        }
        processed
    }

    /// The store this driver applies to.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn handle(&self, event: UiEvent) {
        match event {
            UiEvent::SignInCompleted { token, result } => self.complete_sign_in(token, result),
            UiEvent::ProviderChanged(identity) => self.follow_provider(identity),
        }
    }

    fn complete_sign_in(&self, token: RequestToken, result: Result<Identity, AuthError>) {
        // Every started call reports once; never wrap below zero.
        let _ = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));

        let latest = RequestToken(self.latest.load(Ordering::SeqCst));
        if token != latest {
            tracing::debug!(%token, %latest, "discarding stale sign-in result");
            return;
        }

        let session = match result {
            Ok(identity) => {
                tracing::info!(%token, %identity, "sign-in succeeded");
                Session::Authenticated { identity }
            }
            Err(e) => {
                tracing::warn!(%token, error = %e, "sign-in failed");
                Session::failed(e.kind())
            }
        };
        self.store.apply(session);
    }

    /// Provider pushes follow the provider's truth, except:
    ///
    /// - nothing pre-empts a sign-in in flight
    /// - a signed-in push is ignored while any sign-in call, stale or not,
    ///   is unresolved, since it may be that call's echo
    /// - a signed-out push only ends an authenticated session; `Failed`
    ///   stays for the user to see
    fn follow_provider(&self, identity: Option<Identity>) {
        let status = self.store.current().status();
        let unresolved = self.in_flight.load(Ordering::SeqCst);
        match (identity, status) {
            (_, SessionStatus::Authenticating) => {
                tracing::debug!("provider push ignored while sign-in is in flight");
            }
            (Some(identity), _) if unresolved > 0 => {
                tracing::debug!(
                    %identity,
                    unresolved,
                    "provider sign-in push ignored, own sign-in calls unresolved"
                );
            }
            (Some(identity), _) => {
                tracing::info!(%identity, "provider reports signed in");
                self.store.apply(Session::Authenticated { identity });
            }
            (None, SessionStatus::Authenticated) => {
                tracing::info!("provider ended the session");
                self.store.apply(Session::Unauthenticated);
            }
            (None, _) => {}
        }
    }
}

impl<G: AuthGateway> Drop for SessionDriver<G> {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            self.gateway.remove_state_listener(handle);
        }
    }
}
