//! Rate limiting primitives for authentication attempts.
//!
//! Flow Overview:
//! 1) Each key (e.g. `login:<email>`) owns one fixed-window bucket.
//! 2) The first attempt opens the window; every attempt increments the counter.
//! 3) Attempts beyond `max_attempts` inside the window are limited.
//! 4) Once the window elapses the bucket starts over.
//!
//! Buckets are process-local and cleared on restart. All requests share one
//! mutex-guarded map, so concurrent attempts for the same key see a single counter.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

/// Snapshot of a bucket for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
}

pub trait RateLimiter: Send + Sync {
    /// Register one attempt for `key` and decide whether it may proceed.
    fn check(&self, key: &str, max_attempts: u32, window: Duration) -> RateLimitDecision;

    /// Forget all attempts recorded for `key`.
    fn reset(&self, key: &str);

    /// Current bucket state for `key`, if the limiter tracks it.
    fn status(&self, key: &str, limit: u32) -> Option<RateLimitStatus>;

    fn allow(&self, key: &str, max_attempts: u32, window: Duration) -> bool {
        self.check(key, max_attempts, window) == RateLimitDecision::Allowed
    }
}

#[derive(Clone, Copy, Debug)]
struct Bucket {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl Bucket {
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.window
    }
}

// Prune expired buckets once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl InMemoryRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`RateLimiter::check`] with an explicit clock reading.
    pub fn check_at(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
        now: Instant,
    ) -> RateLimitDecision {
        let Ok(mut buckets) = self.buckets.lock() else {
            error!("rate limiter lock poisoned, denying attempt");
            return RateLimitDecision::Limited;
        };

        if buckets.len() >= PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| !bucket.expired(now));
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            window_start: now,
            window,
        });
        if bucket.expired(now) {
            *bucket = Bucket {
                count: 0,
                window_start: now,
                window,
            };
        }
        bucket.count = bucket.count.saturating_add(1);

        if bucket.count > max_attempts {
            warn!(key, attempts = bucket.count, "rate limit exceeded");
            RateLimitDecision::Limited
        } else {
            RateLimitDecision::Allowed
        }
    }

    fn status_at(&self, key: &str, limit: u32, now: Instant) -> Option<RateLimitStatus> {
        let buckets = self.buckets.lock().ok()?;
        let count = buckets
            .get(key)
            .filter(|bucket| !bucket.expired(now))
            .map_or(0, |bucket| bucket.count);
        Some(RateLimitStatus {
            count,
            limit,
            remaining: limit.saturating_sub(count),
        })
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str, max_attempts: u32, window: Duration) -> RateLimitDecision {
        self.check_at(key, max_attempts, window, Instant::now())
    }

    fn reset(&self, key: &str) {
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets.remove(key);
        }
    }

    fn status(&self, key: &str, limit: u32) -> Option<RateLimitStatus> {
        self.status_at(key, limit, Instant::now())
    }
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _key: &str, _max_attempts: u32, _window: Duration) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn reset(&self, _key: &str) {}

    fn status(&self, _key: &str, _limit: u32) -> Option<RateLimitStatus> {
        None
    }
}
