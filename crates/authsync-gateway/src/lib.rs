//! Identity provider boundary for authsync.
//!
//! authsync doesn't verify passwords, store tokens, or talk to an auth
//! server itself. All of that belongs to an identity provider (Firebase,
//! Auth0, Supabase, a company SSO endpoint, ...). This crate defines the
//! [`AuthGateway`] trait the session layer consumes, the [`AuthError`]
//! taxonomy gateways report failures in, and an in-process
//! [`MemoryGateway`] for development and tests.
//!
//! # Feature Flags
//!
//! - `memory` (default): [`MemoryGateway`], a simulated provider with
//!   configurable latency

#![allow(async_fn_in_trait)]

mod error;
mod gateway;
#[cfg(feature = "memory")]
mod memory;

pub use error::AuthError;
pub use gateway::{AuthGateway, ListenerHandle, StateListener};
#[cfg(feature = "memory")]
pub use memory::{MemoryGateway, MemoryGatewayConfig};
