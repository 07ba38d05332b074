//! Counter store contract and the bundled in-process implementation.
//!
//! A store must increment and check in one atomic step; callers never read a
//! counter and write it back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;

use super::{Bucket, WINDOW};

/// Static description of one bucket: budget and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSpec {
    pub bucket: Bucket,
    pub points: u32,
    pub window: Duration,
}

/// Counter snapshot right after a consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    pub remaining_points: u32,
    pub consumed_points: u32,
    pub ms_before_next: u64,
    pub is_first_in_duration: bool,
}

/// Explicit outcome kinds so callers never inspect error shapes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConsumeError {
    /// Budget exhausted; carries the counter as it stands.
    #[error("rate limit exceeded")]
    LimitExceeded(CounterState),
    /// Store unreachable, timed out, or answered nonsense.
    #[error("counter store fault: {0}")]
    Fault(String),
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Consume one point from `(spec.bucket, identity)` in the current window.
    async fn consume(&self, spec: &BucketSpec, identity: &str) -> Result<CounterState, ConsumeError>;
}

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    consumed: u32,
    expires_at: Instant,
}

/// DashMap-backed fixed-window store.
///
/// A window opens on the first consume for a key and lasts `spec.window`.
/// The shard lock held by `entry` makes increment-and-check atomic per key.
/// Expired entries are trimmed lazily once the map grows past `max_entries`,
/// at most once per `purge_interval`. A map full of live windows is therefore
/// scanned once per interval, not on every consume.
pub struct InMemoryCounterStore {
    table: String,
    counters: DashMap<String, WindowCounter>,
    max_entries: usize,
    purge_interval: Duration,
    next_purge_at: Mutex<Instant>,
    purges: AtomicU64,
}

impl InMemoryCounterStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self::with_capacity_limit(table, 100_000)
    }

    pub fn with_capacity_limit(table: impl Into<String>, max_entries: usize) -> Self {
        Self {
            table: table.into(),
            counters: DashMap::new(),
            max_entries: max_entries.max(1),
            purge_interval: WINDOW,
            next_purge_at: Mutex::new(Instant::now()),
            purges: AtomicU64::new(0),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    fn key(&self, bucket: Bucket, identity: &str) -> String {
        format!("{}:{}:{}", self.table, bucket.key_prefix(), identity)
    }

    /// Number of capacity-triggered purges run so far.
    pub fn purge_count(&self) -> u64 {
        self.purges.load(Ordering::Relaxed)
    }

    /// Drop counters whose window has closed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.counters.retain(|_, c| c.expires_at > now);
    }

    fn maybe_purge(&self) {
        if self.counters.len() <= self.max_entries {
            return;
        }
        // Another caller holding the lock is already purging.
        let Ok(mut next) = self.next_purge_at.try_lock() else {
            return;
        };
        let now = Instant::now();
        if now < *next {
            return;
        }
        *next = now + self.purge_interval;
        drop(next);

        self.purge_expired();
        self.purges.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(len = self.counters.len(), max = self.max_entries, "counter store trimmed");
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn consume(&self, spec: &BucketSpec, identity: &str) -> Result<CounterState, ConsumeError> {
        self.maybe_purge();

        let now = Instant::now();
        let key = self.key(spec.bucket, identity);

        let state = {
            let mut entry = self.counters.entry(key).or_insert_with(|| WindowCounter {
                consumed: 0,
                expires_at: now + spec.window,
            });
            if entry.expires_at <= now {
                *entry = WindowCounter { consumed: 0, expires_at: now + spec.window };
            }
            entry.consumed = entry.consumed.saturating_add(1);

            let ms_before_next = entry.expires_at.saturating_duration_since(now).as_millis();
            CounterState {
                remaining_points: spec.points.saturating_sub(entry.consumed),
                consumed_points: entry.consumed,
                ms_before_next: u64::try_from(ms_before_next).unwrap_or(u64::MAX),
                is_first_in_duration: entry.consumed == 1,
            }
        };

        if state.consumed_points > spec.points {
            Err(ConsumeError::LimitExceeded(state))
        } else {
            Ok(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(bucket: Bucket, points: u32) -> BucketSpec {
        BucketSpec { bucket, points, window: Duration::from_secs(60) }
    }

    #[tokio::test(start_paused = true)]
    async fn counts_up_to_budget_then_exceeds() {
        let store = InMemoryCounterStore::new("t");
        let s = spec(Bucket::Standard, 3);

        for n in 1..=3 {
            let st = store.consume(&s, "ip").await.unwrap();
            assert_eq!(st.consumed_points, n);
            assert_eq!(st.remaining_points, 3 - n);
            assert_eq!(st.is_first_in_duration, n == 1);
        }
        match store.consume(&s, "ip").await {
            Err(ConsumeError::LimitExceeded(st)) => {
                assert_eq!(st.remaining_points, 0);
                assert_eq!(st.consumed_points, 4);
            }
            other => panic!("expected limit exceeded, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_expiry() {
        let store = InMemoryCounterStore::new("t");
        let s = spec(Bucket::Standard, 1);

        store.consume(&s, "ip").await.unwrap();
        assert!(store.consume(&s, "ip").await.is_err());

        tokio::time::advance(Duration::from_secs(30)).await;
        let err = store.consume(&s, "ip").await.unwrap_err();
        match err {
            ConsumeError::LimitExceeded(st) => assert_eq!(st.ms_before_next, 30_000),
            other => panic!("unexpected {other:?}"),
        }

        tokio::time::advance(Duration::from_secs(31)).await;
        let st = store.consume(&s, "ip").await.unwrap();
        assert_eq!(st.consumed_points, 1);
        assert!(st.is_first_in_duration);
        assert_eq!(st.ms_before_next, 60_000);
    }

    #[tokio::test(start_paused = true)]
    async fn buckets_and_identities_are_isolated() {
        let store = InMemoryCounterStore::new("t");
        let standard = spec(Bucket::Standard, 1);
        let adm = spec(Bucket::Admin, 1);

        store.consume(&standard, "ip").await.unwrap();
        assert!(store.consume(&standard, "ip").await.is_err());

        assert_eq!(store.consume(&adm, "ip").await.unwrap().consumed_points, 1);
        assert_eq!(store.consume(&standard, "other").await.unwrap().consumed_points, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_closed_windows() {
        let store = InMemoryCounterStore::with_capacity_limit("t", 1);
        let s = spec(Bucket::Standard, 5);
        store.consume(&s, "a").await.unwrap();
        store.consume(&s, "b").await.unwrap();
        assert_eq!(store.len(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        store.consume(&s, "c").await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_runs_at_most_once_per_interval() {
        let store = InMemoryCounterStore::with_capacity_limit("t", 1);
        let s = spec(Bucket::Standard, 5);
        for id in ["a", "b", "c"] {
            store.consume(&s, id).await.unwrap();
        }
        assert_eq!(store.purge_count(), 1);

        // Over capacity with only live windows: no rescan until the interval passes.
        tokio::time::advance(Duration::from_secs(30)).await;
        store.consume(&s, "d").await.unwrap();
        store.consume(&s, "e").await.unwrap();
        assert_eq!(store.purge_count(), 1);
        assert_eq!(store.len(), 5);

        tokio::time::advance(Duration::from_secs(31)).await;
        store.consume(&s, "f").await.unwrap();
        assert_eq!(store.purge_count(), 2);
        // a..c expired; d and e are still inside their window.
        assert_eq!(store.len(), 3);
    }
}
