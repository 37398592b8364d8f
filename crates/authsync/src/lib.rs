//! # authsync
//!
//! Keep a UI in step with an identity provider's sign-in session.
//!
//! An application implements (or picks) an [`AuthGateway`](prelude::AuthGateway)
//! for its provider, builds an [`AuthSync`] around it, and runs the returned
//! [`SessionDriver`](prelude::SessionDriver) on its UI context. Screens
//! observe the session through scopes and issue sign-in/sign-out intents;
//! the framework handles ordering, stale results, and provider pushes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use authsync::prelude::*;
//!
//! # async fn demo() -> Result<(), AuthSyncError> {
//! let gateway = Arc::new(
//!     MemoryGateway::new(MemoryGatewayConfig::default()).with_account("a@b.com", "secret"),
//! );
//! let (auth, driver) = AuthSync::<MemoryGateway>::builder().build(gateway)?;
//! tokio::spawn(driver.run());
//!
//! let mut screen = AuthScreen::new(&auth, "sign-in");
//! screen.show()?;
//! screen.set_identifier("a@b.com");
//! screen.set_secret("secret");
//! screen.submit(&auth);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod logging;
mod screen;

pub use client::{AuthSync, AuthSyncBuilder};
pub use error::AuthSyncError;
pub use logging::init_logging;
pub use screen::{AuthScreen, GALLERY_IMAGES, Gallery, ScreenView, failure_message};

pub mod prelude {
    //! Everything an application needs in one import.

    pub use crate::{
        AuthScreen, AuthSync, AuthSyncBuilder, AuthSyncError, Gallery, ScreenView,
    };
    pub use authsync_gateway::{
        AuthError, AuthGateway, ListenerHandle, MemoryGateway, MemoryGatewayConfig, StateListener,
    };
    pub use authsync_session::{
        ObserverScope, ScopeHandle, SessionDriver, SessionStore, SubscriptionHandle, SyncConfig,
    };
    pub use authsync_types::{
        AuthErrorKind, Credentials, Identity, RequestToken, Session, SessionStatus,
    };
}
