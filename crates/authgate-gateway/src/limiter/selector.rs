//! Tier -> bucket selection and bounded consume.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TrustTier;
use crate::config::LimitsSection;

use super::store::{BucketSpec, ConsumeError, CounterState, CounterStore};
use super::{Bucket, WINDOW};

/// Process-wide limiter. Built once at startup; budgets never change after.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    admin: BucketSpec,
    standard: BucketSpec,
    timeout: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, limits: &LimitsSection) -> Self {
        Self {
            store,
            admin: BucketSpec { bucket: Bucket::Admin, points: limits.admin_points, window: WINDOW },
            standard: BucketSpec {
                bucket: Bucket::Standard,
                points: limits.standard_points,
                window: WINDOW,
            },
            timeout: limits.store_timeout(),
        }
    }

    pub fn spec(&self, bucket: Bucket) -> &BucketSpec {
        match bucket {
            Bucket::Admin => &self.admin,
            Bucket::Standard => &self.standard,
        }
    }

    /// Consume one point for `identity` in the tier's bucket.
    ///
    /// Override callers are never counted. The store call is bounded by the
    /// configured timeout; expiry is reported as a fault and not retried.
    pub async fn consume(&self, tier: TrustTier, identity: &str) -> Option<Result<CounterState, ConsumeError>> {
        let bucket = Bucket::for_tier(tier)?;
        let spec = self.spec(bucket);

        let res = match tokio::time::timeout(self.timeout, self.store.consume(spec, identity)).await {
            Ok(r) => r,
            Err(_) => Err(ConsumeError::Fault(format!(
                "consume timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };
        Some(res)
    }
}
