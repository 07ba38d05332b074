//! Wire formats exchanged with the invoking gateway.
//!
//! - Inbound: the authorizer event (see `crate::request::parse_event`).
//! - Outbound: the policy response built by `policy::encode`.
//!
//! Encoding never fails: every verdict maps to exactly one response object.

pub mod policy;
