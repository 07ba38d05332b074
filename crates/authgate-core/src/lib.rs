//! authgate core: request snapshot, verdict model, error types, and the
//! authorizer wire protocol.
//!
//! This crate defines the contracts shared by the decision engine and anything
//! that invokes it. It intentionally carries no runtime, crypto, or storage
//! dependencies so the types can be reused by gateway adapters and tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed inbound events surface as `AuthGateError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod request;
pub mod verdict;

/// Shared result type.
pub use error::{AuthGateError, Result};
pub use request::{Headers, RequestContext};
pub use verdict::{DiagnosticContext, Effect, Verdict};
