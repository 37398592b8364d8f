//! Shared value types for authsync.
//!
//! This crate defines the data every other layer talks about:
//!
//! - **Session** ([`Session`], [`SessionStatus`]): whether, and as whom,
//!   the user is currently signed in.
//! - **Identity** ([`Identity`]): the provider's account identifier.
//! - **Credentials** ([`Credentials`]): the transient sign-in input.
//! - **Error kinds** ([`AuthErrorKind`]): the closed taxonomy a failed
//!   session carries.
//!
//! # Architecture
//!
//! ```text
//! Presentation (above)  ← renders Session, builds Credentials
//!     ↕
//! Session layer         ← stores Session, drives transitions
//!     ↕
//! Gateway layer         ← turns Credentials into Identity or AuthErrorKind
//! ```
//!
//! Nothing in here performs I/O.

mod credentials;
mod types;

pub use credentials::Credentials;
pub use types::{AuthErrorKind, Identity, RequestToken, Session, SessionStatus};
