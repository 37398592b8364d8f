//! The identity provider contract.
//!
//! The session layer is generic over [`AuthGateway`] and never names a
//! concrete provider. An application constructs one gateway at startup and
//! hands it to the session layer explicitly; there is no global instance.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use authsync_types::{Credentials, Identity};

use crate::AuthError;

/// Callback for the provider's out-of-band state notifications.
///
/// Called with `Some(identity)` when the provider considers a user signed
/// in and `None` when it considers nobody signed in (explicit sign-out,
/// token expiry, account disabled remotely, ...). Providers may call it from
/// any thread.
pub type StateListener = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Opaque handle for a registered [`StateListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    /// Creates a handle from a raw id. Gateways pick the numbering.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying id.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Verifies credentials and reports session changes.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → the gateway is shared through an `Arc` with
///   background tasks that outlive the call that started them.
/// - The returned futures are `Send` so they can run on any runtime worker.
///
/// # Example
///
/// ```rust
/// use authsync_gateway::{AuthError, AuthGateway, ListenerHandle, StateListener};
/// use authsync_types::{Credentials, Identity};
///
/// /// Accepts one hard-coded account. Development only.
/// struct SingleUserGateway;
///
/// impl AuthGateway for SingleUserGateway {
///     async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
///         if credentials.identifier == "dev@local" && credentials.secret == "dev" {
///             Ok(Identity::new("dev@local"))
///         } else {
///             Err(AuthError::InvalidCredentials)
///         }
///     }
///
///     async fn sign_out(&self) -> Result<(), AuthError> {
///         Ok(())
///     }
///
///     fn current_identity(&self) -> Option<Identity> {
///         None
///     }
///
///     fn add_state_listener(&self, _listener: StateListener) -> ListenerHandle {
///         ListenerHandle::new(0)
///     }
///
///     fn remove_state_listener(&self, _handle: ListenerHandle) -> bool {
///         false
///     }
/// }
/// ```
pub trait AuthGateway: Send + Sync + 'static {
    /// Verifies `credentials` with the provider.
    ///
    /// # Returns
    /// - `Ok(Identity)`: the provider accepted the credentials
    /// - `Err(AuthError)`: rejected or unreachable, already classified
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Ends the provider-side session.
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// The identity the provider considers signed in right now.
    ///
    /// Synchronous snapshot, queried once at startup.
    fn current_identity(&self) -> Option<Identity>;

    /// Registers a callback for provider-pushed state changes.
    ///
    /// A push caused by [`sign_in`](Self::sign_in) must be delivered before
    /// that call's future resolves (or not at all). The session layer ignores
    /// signed-in pushes while any of its own sign-in calls are unresolved,
    /// so a push that trails its result could revive a superseded request.
    fn add_state_listener(&self, listener: StateListener) -> ListenerHandle;

    /// Removes a listener. Returns `false` if it was not registered.
    fn remove_state_listener(&self, handle: ListenerHandle) -> bool;
}
