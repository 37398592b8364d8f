//! The session store: one current session, many observers.
//!
//! # Delivery model
//!
//! Observers are called outside the state lock, so an observer may read the
//! store, subscribe, or unsubscribe from inside its callback without
//! deadlocking.
//!
//! Each transition snapshots the observer list at the moment it is applied
//! and goes onto a FIFO queue. Whoever applied the first queued transition
//! drains the queue. A transition applied from inside an observer callback
//! is therefore delivered after the current one finishes, never interleaved
//! with it, and every observer sees transitions in `apply()` order.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use authsync_types::Session;
use parking_lot::Mutex;

/// Callback invoked with the new session on every transition.
pub type Observer = Arc<dyn Fn(&Session) + Send + Sync>;

/// Opaque token for one registration. Pass it to
/// [`SessionStore::unsubscribe`] to remove exactly that observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A transition waiting to be delivered, with the observers that were
/// registered when it was applied.
struct Pending {
    session: Session,
    observers: Vec<(SubscriptionHandle, Observer)>,
}

struct StoreState {
    current: Session,
    /// Registration order is delivery order.
    observers: Vec<(SubscriptionHandle, Observer)>,
    next_id: u64,
    queue: VecDeque<Pending>,
    /// `true` while some call is draining `queue`.
    delivering: bool,
}

impl StoreState {
    fn is_registered(&self, handle: SubscriptionHandle) -> bool {
        self.observers.iter().any(|(h, _)| *h == handle)
    }
}

/// Holds the single current [`Session`] and fans out transitions.
///
/// Cheap to clone: clones share the same session and observer list.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<Mutex<StoreState>>,
}

impl SessionStore {
    /// Creates a store whose session starts `Unauthenticated`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                current: Session::Unauthenticated,
                observers: Vec::new(),
                next_id: 1,
                queue: VecDeque::new(),
                delivering: false,
            })),
        }
    }

    /// Returns the latest session snapshot.
    ///
    /// Never waits on observer callbacks.
    pub fn current(&self) -> Session {
        self.state.lock().current.clone()
    }

    /// Registers `observer` and calls it once with the current session, then
    /// again on every later transition.
    ///
    /// The replay goes through the same delivery queue as transitions, so it
    /// always precedes any transition applied after it, whichever thread
    /// applies it. Outside a delivery the replay runs before `subscribe`
    /// returns; from inside an observer callback (or while another thread is
    /// delivering) it runs once the delivery in progress finishes.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionHandle
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        let handle = {
            let mut state = self.state.lock();
            let handle = SubscriptionHandle(state.next_id);
            state.next_id += 1;
            state.observers.push((handle, Observer::clone(&observer)));

            let replay = Pending {
                session: state.current.clone(),
                observers: vec![(handle, observer)],
            };
            tracing::debug!(%handle, session = %replay.session, "observer subscribed");
            state.queue.push_back(replay);
            if state.delivering {
                return handle;
            }
            state.delivering = true;
            handle
        };

        self.drain();
        handle
    }

    /// Removes the observer registered under `handle`.
    ///
    /// Returns `false` (and does nothing) if it was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut state = self.state.lock();
        let before = state.observers.len();
        state.observers.retain(|(h, _)| *h != handle);
        let removed = state.observers.len() != before;
        if removed {
            tracing::debug!(%handle, "observer unsubscribed");
        }
        removed
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    /// Replaces the current session and notifies every registered observer
    /// in registration order.
    ///
    /// Returns `false` without notifying anyone when `session` is equal to
    /// the current one. With no observers registered this only updates the
    /// stored value.
    pub(crate) fn apply(&self, session: Session) -> bool {
        {
            let mut state = self.state.lock();
            if state.current == session {
                tracing::trace!(%session, "transition skipped (unchanged)");
                return false;
            }

            let previous = std::mem::replace(&mut state.current, session.clone());
            tracing::info!(from = %previous, to = %session, "session transition");

            let observers = state.observers.clone();
            state.queue.push_back(Pending { session, observers });
            if state.delivering {
                // The call already draining the queue will deliver it.
                return true;
            }
            state.delivering = true;
        }

        self.drain();
        true
    }

    fn drain(&self) {
        let mut guard = DeliveryGuard {
            store: self,
            armed: true,
        };
        loop {
            let pending = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(pending) => pending,
                    None => {
                        // Cleared under the same lock as the empty check, so
                        // a concurrent apply either lands in this queue or
                        // starts its own drain.
                        state.delivering = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            for (handle, observer) in &pending.observers {
                // Unsubscribed by an earlier observer during this delivery.
                if !self.state.lock().is_registered(*handle) {
                    continue;
                }
                observer(&pending.session);
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SessionStore")
            .field("current", &state.current)
            .field("observers", &state.observers.len())
            .finish()
    }
}

/// Resets the delivery state if an observer panics mid-drain, so later
/// transitions are still delivered.
struct DeliveryGuard<'a> {
    store: &'a SessionStore,
    armed: bool,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.store.state.lock();
        state.delivering = false;
        state.queue.clear();
    }
}

// =========================================================================
// Tests
// =========================================================================
