//! Integration tests for the controller → gateway → driver → store loop.
//!
//! Uses a scripted gateway: each expected sign-in gets a oneshot channel
//! that the test resolves whenever it wants, so completion order is fully
//! under the test's control.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use authsync_gateway::{
    AuthError, AuthGateway, ListenerHandle, MemoryGateway, MemoryGatewayConfig, StateListener,
};
use authsync_session::{SessionDriver, SessionError, SessionStore, SignInController, SyncConfig};
use authsync_types::{AuthErrorKind, Credentials, Identity, RequestToken, Session};
use parking_lot::Mutex;
use tokio::sync::oneshot;

// =========================================================================
// Scripted gateway
// =========================================================================

type Reply = Result<Identity, AuthError>;

#[derive(Default)]
struct ScriptedGateway {
    /// identifier → where the test will send the result
    pending: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    sign_out_result: Mutex<Option<Result<(), AuthError>>>,
    current: Mutex<Option<Identity>>,
    listeners: Mutex<Vec<(ListenerHandle, StateListener)>>,
    sign_out_calls: Mutex<usize>,
    /// Push `Some(identity)` on success before returning, like a hosted
    /// provider does.
    push_on_success: bool,
    /// Identifiers whose sign-in panics inside the gateway.
    panics: Mutex<HashSet<String>>,
}

impl ScriptedGateway {
    /// A gateway that echoes every successful sign-in to its listeners.
    fn pushing() -> Self {
        Self {
            push_on_success: true,
            ..Self::default()
        }
    }

    /// Makes the sign-in for `identifier` panic.
    fn panic_on(&self, identifier: &str) {
        self.panics.lock().insert(identifier.to_string());
    }

    /// Prepares a sign-in for `identifier`; send on the returned channel to
    /// resolve it.
    fn expect(&self, identifier: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(identifier.to_string(), rx);
        tx
    }

    /// Makes `sign_out` fail with `err` instead of succeeding.
    fn fail_sign_out(&self, err: AuthError) {
        *self.sign_out_result.lock() = Some(Err(err));
    }

    /// Simulates a provider-side push to every listener.
    fn push(&self, identity: Option<Identity>) {
        let listeners: Vec<StateListener> =
            self.listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(identity.clone());
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl AuthGateway for ScriptedGateway {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        if self.panics.lock().contains(&credentials.identifier) {
            panic!("gateway bug for {}", credentials.identifier);
        }
        let rx = self.pending.lock().remove(&credentials.identifier);
        let result = match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(AuthError::Unknown("script dropped".into()))),
            // Unscripted sign-ins never resolve.
            None => std::future::pending().await,
        };
        if let (true, Ok(identity)) = (self.push_on_success, &result) {
            *self.current.lock() = Some(identity.clone());
            self.push(Some(identity.clone()));
        }
        result
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.sign_out_calls.lock() += 1;
        let scripted = self.sign_out_result.lock().clone();
        scripted.unwrap_or(Ok(()))
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.lock().clone()
    }

    fn add_state_listener(&self, listener: StateListener) -> ListenerHandle {
        let mut listeners = self.listeners.lock();
        let handle = ListenerHandle::new(listeners.len() as u64 + 1);
        listeners.push((handle, listener));
        handle
    }

    fn remove_state_listener(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        listeners.len() != before
    }
}

// =========================================================================
// Helpers
// =========================================================================

struct Harness {
    gateway: Arc<ScriptedGateway>,
    controller: SignInController<ScriptedGateway>,
    driver: SessionDriver<ScriptedGateway>,
    seen: Arc<Mutex<Vec<Session>>>,
}

fn harness_with(gateway: ScriptedGateway, config: SyncConfig) -> Harness {
    let gateway = Arc::new(gateway);
    let store = SessionStore::new();
    let (controller, driver) =
        SignInController::new(Arc::clone(&gateway), store.clone(), config).expect("inside runtime");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |s: &Session| sink.lock().push(s.clone()));
    seen.lock().clear();
    Harness {
        gateway,
        controller,
        driver,
        seen,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedGateway::default(), SyncConfig::default())
}

fn creds(id: &str, secret: &str) -> Credentials {
    Credentials::new(id, secret)
}

/// Applies the next `n` events. A successful reply from a pushing gateway
/// is two events: the provider's push, then the completion.
async fn next_events(driver: &mut SessionDriver<ScriptedGateway>, n: usize) {
    for _ in 0..n {
        assert!(driver.next_event().await, "driver channel closed early");
    }
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test]
async fn test_sign_in_success_becomes_authenticated() {
    let mut h = harness();
    let reply = h.gateway.expect("a@b.com");

    h.controller.sign_in(creds("a@b.com", "correct"));
    assert_eq!(h.controller.store().current(), Session::Authenticating);

    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    assert!(h.driver.next_event().await);

    assert_eq!(h.driver.store().current(), Session::authenticated("a@b.com"));
    assert_eq!(
        *h.seen.lock(),
        vec![Session::Authenticating, Session::authenticated("a@b.com")]
    );
}

#[tokio::test]
async fn test_sign_in_failure_becomes_failed_with_kind() {
    let mut h = harness();
    let reply = h.gateway.expect("a@b.com");

    h.controller.sign_in(creds("a@b.com", "wrong"));
    reply.send(Err(AuthError::InvalidCredentials)).unwrap();
    h.driver.next_event().await;

    let session = h.driver.store().current();
    assert_eq!(session, Session::failed(AuthErrorKind::InvalidCredentials));
    assert!(session.identity().is_none());
}

#[tokio::test]
async fn test_failed_is_not_reset_or_retried_automatically() {
    let mut h = harness();
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "wrong"));
    reply.send(Err(AuthError::Network("offline".into()))).unwrap();
    h.driver.next_event().await;

    // A provider "signed out" push must not wipe the failure either.
    h.gateway.push(None);
    h.driver.next_event().await;
    assert_eq!(h.driver.pump(), 0, "nothing else queued");

    assert_eq!(
        h.driver.store().current(),
        Session::failed(AuthErrorKind::NetworkError)
    );
}

#[tokio::test]
async fn test_retry_after_failure_goes_back_to_authenticating() {
    let mut h = harness();
    let first = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "wrong"));
    first.send(Err(AuthError::InvalidCredentials)).unwrap();
    h.driver.next_event().await;

    let second = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));
    assert_eq!(h.driver.store().current(), Session::Authenticating);
    second.send(Ok(Identity::new("a@b.com"))).unwrap();
    h.driver.next_event().await;

    assert_eq!(h.driver.store().current(), Session::authenticated("a@b.com"));
}

// =========================================================================
// Latest request wins
// =========================================================================

#[tokio::test]
async fn test_latest_request_wins_when_older_resolves_last() {
    let mut h = harness();
    let c1 = h.gateway.expect("one@b.com");
    let c2 = h.gateway.expect("two@b.com");

    let t1 = h.controller.sign_in(creds("one@b.com", "x"));
    let t2 = h.controller.sign_in(creds("two@b.com", "y"));
    assert!(t2 > t1);

    c2.send(Ok(Identity::new("two@b.com"))).unwrap();
    h.driver.next_event().await;
    c1.send(Err(AuthError::InvalidCredentials)).unwrap();
    h.driver.next_event().await;

    assert_eq!(h.driver.store().current(), Session::authenticated("two@b.com"));
    assert_eq!(
        *h.seen.lock(),
        vec![Session::Authenticating, Session::authenticated("two@b.com")],
        "second submit adds no duplicate Authenticating, stale result is invisible"
    );
}

#[tokio::test]
async fn test_latest_request_wins_when_older_resolves_first() {
    let mut h = harness();
    let c1 = h.gateway.expect("one@b.com");
    let c2 = h.gateway.expect("two@b.com");
    h.controller.sign_in(creds("one@b.com", "x"));
    h.controller.sign_in(creds("two@b.com", "y"));

    c1.send(Ok(Identity::new("one@b.com"))).unwrap();
    h.driver.next_event().await;
    assert_eq!(
        h.driver.store().current(),
        Session::Authenticating,
        "stale success must not land"
    );

    c2.send(Err(AuthError::InvalidCredentials)).unwrap();
    h.driver.next_event().await;

    assert_eq!(
        h.driver.store().current(),
        Session::failed(AuthErrorKind::InvalidCredentials)
    );
}

#[tokio::test]
async fn test_sign_out_makes_in_flight_sign_in_stale() {
    let mut h = harness();
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));

    h.controller.sign_out();
    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    h.driver.next_event().await;

    assert_eq!(h.driver.store().current(), Session::Unauthenticated);
}

#[tokio::test]
async fn test_tokens_increase_across_sign_in_and_sign_out() {
    let h = harness();
    assert_eq!(h.controller.latest_token(), None);

    let a = h.controller.sign_in(creds("a@b.com", "x"));
    let b = h.controller.sign_out();
    let c = h.controller.sign_in(creds("a@b.com", "x"));

    assert_eq!((a, b, c), (RequestToken(1), RequestToken(2), RequestToken(3)));
    assert_eq!(h.controller.latest_token(), Some(RequestToken(3)));
}

// =========================================================================
// Latest request wins, provider echoing its sign-ins
// =========================================================================

#[tokio::test]
async fn test_stale_sign_in_push_does_not_replace_newer_result() {
    let mut h = harness_with(ScriptedGateway::pushing(), SyncConfig::default());
    let old = h.gateway.expect("old@b.com");
    let new = h.gateway.expect("new@b.com");
    h.controller.sign_in(creds("old@b.com", "x"));
    h.controller.sign_in(creds("new@b.com", "y"));

    new.send(Ok(Identity::new("new@b.com"))).unwrap();
    next_events(&mut h.driver, 2).await;
    assert_eq!(h.driver.store().current(), Session::authenticated("new@b.com"));

    old.send(Ok(Identity::new("old@b.com"))).unwrap();
    next_events(&mut h.driver, 2).await;

    assert_eq!(h.driver.store().current(), Session::authenticated("new@b.com"));
    assert_eq!(
        *h.seen.lock(),
        vec![Session::Authenticating, Session::authenticated("new@b.com")]
    );
}

#[tokio::test]
async fn test_stale_sign_in_push_does_not_replace_newer_failure() {
    let mut h = harness_with(ScriptedGateway::pushing(), SyncConfig::default());
    let old = h.gateway.expect("old@b.com");
    let new = h.gateway.expect("new@b.com");
    h.controller.sign_in(creds("old@b.com", "x"));
    h.controller.sign_in(creds("new@b.com", "y"));

    new.send(Err(AuthError::InvalidCredentials)).unwrap();
    next_events(&mut h.driver, 1).await;
    old.send(Ok(Identity::new("old@b.com"))).unwrap();
    next_events(&mut h.driver, 2).await;

    assert_eq!(
        h.driver.store().current(),
        Session::failed(AuthErrorKind::InvalidCredentials)
    );
}

#[tokio::test]
async fn test_stale_sign_in_push_ignored_when_older_resolves_first() {
    let mut h = harness_with(ScriptedGateway::pushing(), SyncConfig::default());
    let old = h.gateway.expect("old@b.com");
    let new = h.gateway.expect("new@b.com");
    h.controller.sign_in(creds("old@b.com", "x"));
    h.controller.sign_in(creds("new@b.com", "y"));

    old.send(Ok(Identity::new("old@b.com"))).unwrap();
    next_events(&mut h.driver, 2).await;
    assert_eq!(h.driver.store().current(), Session::Authenticating);

    new.send(Err(AuthError::InvalidCredentials)).unwrap();
    next_events(&mut h.driver, 1).await;

    assert_eq!(
        *h.seen.lock(),
        vec![
            Session::Authenticating,
            Session::failed(AuthErrorKind::InvalidCredentials)
        ]
    );
}

#[tokio::test]
async fn test_sign_out_makes_in_flight_sign_in_push_stale() {
    let mut h = harness_with(ScriptedGateway::pushing(), SyncConfig::default());
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));
    h.controller.sign_out();

    // The provider finishes the sign-in after it processed the sign-out.
    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    next_events(&mut h.driver, 2).await;

    assert_eq!(h.driver.store().current(), Session::Unauthenticated);
    assert_eq!(
        *h.seen.lock(),
        vec![Session::Authenticating, Session::Unauthenticated]
    );
}

#[tokio::test]
async fn test_provider_push_applies_again_once_sign_ins_resolve() {
    let mut h = harness_with(ScriptedGateway::pushing(), SyncConfig::default());
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));
    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    next_events(&mut h.driver, 2).await;

    // Switched accounts in another window of the same provider.
    h.gateway.push(Some(Identity::new("other@b.com")));
    h.driver.pump();

    assert_eq!(h.driver.store().current(), Session::authenticated("other@b.com"));
}

#[tokio::test]
async fn test_panicking_gateway_reports_unknown_failure() {
    let mut h = harness();
    h.gateway.panic_on("bug@b.com");

    h.controller.sign_in(creds("bug@b.com", "x"));
    next_events(&mut h.driver, 1).await;
    assert_eq!(
        h.driver.store().current(),
        Session::failed(AuthErrorKind::Unknown)
    );

    // Nothing is left unresolved, so provider pushes are honored.
    h.gateway.push(Some(Identity::new("a@b.com")));
    h.driver.pump();
    assert_eq!(h.driver.store().current(), Session::authenticated("a@b.com"));
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_during_hosted_sign_in_never_shows_stale_identity() {
    let gateway = Arc::new(
        MemoryGateway::new(MemoryGatewayConfig {
            latency_ms: 100,
            jitter_ms: 0,
        })
        .with_account("a@b.com", "secret"),
    );
    let store = SessionStore::new();
    let (controller, mut driver) =
        SignInController::new(Arc::clone(&gateway), store.clone(), SyncConfig::default())
            .unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |s: &Session| sink.lock().push(s.clone()));
    seen.lock().clear();

    controller.sign_in(creds("a@b.com", "secret"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.sign_out();
    tokio::time::sleep(Duration::from_millis(200)).await;
    driver.pump();

    assert_eq!(
        *seen.lock(),
        vec![Session::Authenticating, Session::Unauthenticated]
    );
    assert_eq!(store.current(), Session::Unauthenticated);
}

// =========================================================================
// Sign-out
// =========================================================================

#[tokio::test]
async fn test_sign_out_from_authenticated_clears_session() {
    let mut h = harness();
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));
    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    h.driver.next_event().await;

    h.controller.sign_out();

    assert_eq!(h.driver.store().current(), Session::Unauthenticated);
}

#[tokio::test]
async fn test_sign_out_clears_session_even_when_gateway_fails() {
    let mut h = harness();
    h.gateway.fail_sign_out(AuthError::Network("offline".into()));
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));
    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    h.driver.next_event().await;

    h.controller.sign_out();
    for _ in 0..10 {
        if *h.gateway.sign_out_calls.lock() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(h.driver.store().current(), Session::Unauthenticated);
    assert_eq!(*h.gateway.sign_out_calls.lock(), 1);
}

#[tokio::test]
async fn test_double_sign_out_notifies_once() {
    let mut h = harness();
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));
    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    h.driver.next_event().await;
    h.seen.lock().clear();

    h.controller.sign_out();
    h.controller.sign_out();

    assert_eq!(*h.seen.lock(), vec![Session::Unauthenticated]);
}

#[tokio::test]
async fn test_sign_out_when_already_signed_out_notifies_nothing() {
    let h = harness();

    h.controller.sign_out();
    h.controller.sign_out();

    assert!(h.seen.lock().is_empty());
}

#[tokio::test]
async fn test_sign_out_from_failed_goes_unauthenticated() {
    let mut h = harness();
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "wrong"));
    reply.send(Err(AuthError::InvalidCredentials)).unwrap();
    h.driver.next_event().await;

    h.controller.sign_out();

    assert_eq!(h.driver.store().current(), Session::Unauthenticated);
}

// =========================================================================
// Provider pushes
// =========================================================================

#[tokio::test]
async fn test_provider_expiry_while_authenticated_signs_out() {
    let mut h = harness();
    let reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));
    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    h.driver.next_event().await;

    h.gateway.push(None);
    assert_eq!(h.driver.pump(), 1);

    assert_eq!(h.driver.store().current(), Session::Unauthenticated);
}

#[tokio::test]
async fn test_provider_push_ignored_while_sign_in_in_flight() {
    let mut h = harness();
    let _reply = h.gateway.expect("a@b.com");
    h.controller.sign_in(creds("a@b.com", "correct"));

    h.gateway.push(Some(Identity::new("other@b.com")));
    h.driver.pump();

    assert_eq!(h.driver.store().current(), Session::Authenticating);
}

#[tokio::test]
async fn test_provider_sign_in_push_authenticates() {
    let mut h = harness();

    h.gateway.push(Some(Identity::new("a@b.com")));
    h.driver.pump();

    assert_eq!(h.driver.store().current(), Session::authenticated("a@b.com"));
}

#[tokio::test]
async fn test_provider_events_disabled_registers_no_listener() {
    let h = harness_with(
        ScriptedGateway::default(),
        SyncConfig {
            follow_provider_events: false,
            ..SyncConfig::default()
        },
    );

    assert_eq!(h.gateway.listener_count(), 0);
}

#[tokio::test]
async fn test_dropping_driver_removes_provider_listener() {
    let h = harness();
    assert_eq!(h.gateway.listener_count(), 1);

    drop(h.driver);

    assert_eq!(h.gateway.listener_count(), 0);
}

// =========================================================================
// Construction
// =========================================================================

#[tokio::test]
async fn test_new_restores_current_identity() {
    let gateway = ScriptedGateway::default();
    *gateway.current.lock() = Some(Identity::new("kept@b.com"));

    let h = harness_with(gateway, SyncConfig::default());

    assert_eq!(h.controller.store().current(), Session::authenticated("kept@b.com"));
}

#[tokio::test]
async fn test_new_without_restore_starts_unauthenticated() {
    let gateway = ScriptedGateway::default();
    *gateway.current.lock() = Some(Identity::new("kept@b.com"));

    let h = harness_with(
        gateway,
        SyncConfig {
            restore_on_start: false,
            ..SyncConfig::default()
        },
    );

    assert_eq!(h.controller.store().current(), Session::Unauthenticated);
}

#[test]
fn test_new_outside_runtime_returns_no_runtime() {
    let result = SignInController::new(
        Arc::new(ScriptedGateway::default()),
        SessionStore::new(),
        SyncConfig::default(),
    );

    assert!(matches!(result, Err(SessionError::NoRuntime(_))));
}

// =========================================================================
// Timeouts and threads
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sign_in_timeout_reports_network_error() {
    let mut h = harness_with(
        ScriptedGateway::default(),
        SyncConfig {
            sign_in_timeout_ms: 2_000,
            ..SyncConfig::default()
        },
    );

    // Unscripted: the gateway never answers. Paused time auto-advances to
    // the deadline once the runtime is idle.
    h.controller.sign_in(creds("slow@b.com", "x"));
    h.driver.next_event().await;

    assert_eq!(
        h.driver.store().current(),
        Session::failed(AuthErrorKind::NetworkError)
    );
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_sign_in_no_longer_blocks_provider_pushes() {
    let mut h = harness_with(
        ScriptedGateway::default(),
        SyncConfig {
            sign_in_timeout_ms: 2_000,
            ..SyncConfig::default()
        },
    );
    h.controller.sign_in(creds("slow@b.com", "x"));
    h.driver.next_event().await;

    h.gateway.push(Some(Identity::new("a@b.com")));
    h.driver.pump();

    assert_eq!(h.driver.store().current(), Session::authenticated("a@b.com"));
}

#[test]
fn test_sign_in_from_non_runtime_thread_is_marshaled_to_driver() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let gateway = Arc::new(ScriptedGateway::default());
    let (controller, mut driver) = {
        let _guard = runtime.enter();
        SignInController::new(Arc::clone(&gateway), SessionStore::new(), SyncConfig::default())
            .unwrap()
    };
    let reply = gateway.expect("a@b.com");

    // This thread is not a runtime thread, like a native UI thread.
    controller.sign_in(creds("a@b.com", "correct"));
    reply.send(Ok(Identity::new("a@b.com"))).unwrap();
    runtime.block_on(driver.next_event());

    assert_eq!(driver.store().current(), Session::authenticated("a@b.com"));
}

#[tokio::test]
async fn test_run_stops_after_controller_dropped() {
    let Harness {
        controller, driver, ..
    } = harness();

    drop(controller);

    tokio::time::timeout(Duration::from_secs(1), driver.run())
        .await
        .expect("driver should stop once its channel closes");
}
