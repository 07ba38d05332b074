//! Rate limiting: bucket selection over an atomic fixed-window counter store.

pub mod selector;
pub mod store;

pub use selector::RateLimiter;
pub use store::{BucketSpec, ConsumeError, CounterState, CounterStore, InMemoryCounterStore};

use std::time::Duration;

use crate::auth::TrustTier;

/// Fixed window shared by every bucket.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Named rate-limit partition. Counters never cross buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Admin,
    Standard,
}

impl Bucket {
    /// Bucket for a tier; `None` means the tier is not rate limited.
    pub fn for_tier(tier: TrustTier) -> Option<Bucket> {
        match tier {
            TrustTier::Override => None,
            TrustTier::Admin => Some(Bucket::Admin),
            TrustTier::Standard | TrustTier::Anonymous => Some(Bucket::Standard),
        }
    }

    /// Key namespace inside the counter table.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Bucket::Admin => "admin",
            Bucket::Standard => "standard",
        }
    }
}
