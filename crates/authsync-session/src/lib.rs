//! Session synchronization for authsync.
//!
//! This crate keeps one authoritative [`Session`](authsync_types::Session)
//! in step with an external identity provider:
//!
//! 1. **Storage and fan-out**: [`SessionStore`] holds the current session
//!    and notifies observers of every transition, in order.
//! 2. **Scoped observation**: [`ObserverScope`] ties a registration to the
//!    interval a UI surface is visible, with exactly one attach and one
//!    detach.
//! 3. **Requests**: [`SignInController`] submits credentials and sign-outs
//!    to the gateway; only the latest request may change the session.
//! 4. **Marshaling**: [`SessionDriver`] runs on the UI-affine context and is
//!    where gateway completions and provider pushes are applied.
//!
//! # How it fits in the stack
//!
//! ```text
//! Presentation (above)        ← sign_in / sign_out / subscribe
//!     ↕
//! Session layer (this crate)  ← store, scopes, controller, driver
//!     ↕
//! Gateway layer (below)       ← AuthGateway: provider calls and pushes
//! ```

mod config;
mod controller;
mod driver;
mod error;
mod scope;
mod store;

pub use config::SyncConfig;
pub use controller::SignInController;
pub use driver::SessionDriver;
pub use error::SessionError;
pub use scope::{ObserverScope, ScopeHandle};
pub use store::{Observer, SessionStore, SubscriptionHandle};
