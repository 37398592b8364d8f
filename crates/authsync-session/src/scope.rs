//! Observer scopes: registrations bound to a visible interval.
//!
//! A UI surface that shows session state should observe the store exactly
//! while it is on screen. [`ObserverScope`] names that surface, and
//! [`ScopeHandle`] is the live registration:
//!
//! ```text
//!   enter() ──→ [ScopeHandle alive] ──→ leave() / drop
//!      │                                     │
//!   subscribe ×1                       unsubscribe ×1
//! ```
//!
//! The release runs in `Drop`, so an early return, a `?`, or a panic
//! unwinding past the handle still unsubscribes exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use authsync_types::Session;

use crate::{SessionError, SessionStore, SubscriptionHandle};

/// One logical observer of a [`SessionStore`], e.g. "sign-in screen".
///
/// At most one registration per scope is live at a time.
pub struct ObserverScope {
    name: String,
    store: SessionStore,
    active: Arc<AtomicBool>,
}

impl ObserverScope {
    /// Creates an inactive scope over `store`.
    pub fn new(store: &SessionStore, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: store.clone(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribes `observer` for as long as the returned handle lives.
    ///
    /// The observer is called with the current session before this returns.
    ///
    /// # Errors
    /// Returns [`SessionError::ScopeActive`] if this scope already has a
    /// live handle. The observer is not registered in that case.
    pub fn enter<F>(&self, observer: F) -> Result<ScopeHandle, SessionError>
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(scope = %self.name, "rejected enter on active scope");
            return Err(SessionError::ScopeActive(self.name.clone()));
        }

        let subscription = self.store.subscribe(observer);
        tracing::debug!(scope = %self.name, %subscription, "scope entered");

        Ok(ScopeHandle {
            name: self.name.clone(),
            store: self.store.clone(),
            subscription,
            active: Arc::clone(&self.active),
        })
    }

    /// `true` while a handle from [`enter`](Self::enter) is alive.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// The scope's name, as used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A live registration created by [`ObserverScope::enter`].
///
/// Consumed by [`leave`](Self::leave); dropping it has the same effect.
#[must_use = "dropping the handle leaves the scope immediately"]
pub struct ScopeHandle {
    name: String,
    store: SessionStore,
    subscription: SubscriptionHandle,
    active: Arc<AtomicBool>,
}

impl ScopeHandle {
    /// The underlying store subscription.
    pub fn subscription(&self) -> SubscriptionHandle {
        self.subscription
    }

    /// Ends the scope: unsubscribes and marks the scope inactive.
    pub fn leave(self) {
        drop(self);
    }
}

impl Drop for ScopeHandle {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
        self.active.store(false, Ordering::Release);
        tracing::debug!(scope = %self.name, subscription = %self.subscription, "scope left");
    }
}

// =========================================================================
// Tests
// =========================================================================
