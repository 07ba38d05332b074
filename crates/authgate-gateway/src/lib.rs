//! authgate gateway library entry.
//!
//! Wires identity resolution, token-tier classification, rate limiting, and
//! the decision engine into an authorizer service. It is intended to be
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod identity;
pub mod limiter;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod transport;
