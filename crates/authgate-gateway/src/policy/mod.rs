//! Access-decision policy (kill switch, tier, rate limit, fault handling).
//!
//! Wires identity resolution, tier classification, and the rate limiter into
//! one verdict per request.

pub mod engine;
pub mod kill_switch;

pub use engine::{Decision, DecisionEngine, DecisionReason, RATE_LIMIT_MESSAGE};
pub use kill_switch::KillSwitch;
