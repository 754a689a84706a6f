//! Fixed-window rate limiting.
//!
//! State is process-local and lost on restart, which degrades to
//! "no limiting" for at most one window.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Seconds until the window resets, rounded up. Suitable for Retry-After.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000)
    }
}

/// Injectable counter storage so tests can supply a deterministic clock and
/// isolated state, and production can swap in a shared cache.
pub trait RateLimitStore: Send + Sync {
    /// Count one request against `key` and decide whether it is allowed.
    fn check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision;

    /// Drop expired buckets. Storage has no eviction otherwise, so callers
    /// should run this periodically or accept growth proportional to the
    /// number of distinct keys seen.
    fn prune(&self, now: DateTime<Utc>);
}

#[derive(Debug, Clone)]
struct Bucket {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// In-memory fixed-window counters keyed by scope string.
pub struct MemoryRateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitStore for MemoryRateLimiter {
    fn check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let mut buckets = self.buckets.lock();

        let bucket = match buckets.get_mut(key) {
            Some(existing) if existing.reset_at > now => {
                existing.count += 1;
                existing.clone()
            }
            _ => {
                // First request in the window, or the previous window elapsed.
                let fresh = Bucket {
                    count: 1,
                    reset_at: now
                        + chrono::Duration::milliseconds(window.as_millis() as i64),
                };
                buckets.insert(key.to_string(), fresh.clone());
                fresh
            }
        };

        RateLimitDecision {
            allowed: bucket.count <= limit,
            limit,
            remaining: limit.saturating_sub(bucket.count),
            reset_at: bucket.reset_at,
        }
    }

    fn prune(&self, now: DateTime<Utc>) {
        self.buckets.lock().retain(|_, bucket| bucket.reset_at > now);
    }
}
