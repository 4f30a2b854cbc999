/// Per-IP login rate limiting
///
/// Classic token bucket: each client IP gets a bucket of `capacity` tokens
/// that refills in full once `window` has elapsed, not continuously. The
/// map is process-local; horizontally scaled deployments under-count
/// across instances (known limitation of the single-process design).
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::clock::Clock;

#[derive(Debug)]
struct TokenBucket {
    tokens: u32,
    window_started_at: DateTime<Utc>,
}

pub struct LoginRateLimiter {
    // Sharded map: entry() is an atomic get-or-create, so racing first
    // requests from one IP never produce duplicate buckets, and distinct
    // IPs do not contend on a global lock.
    buckets: DashMap<String, TokenBucket>,
    capacity: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl LoginRateLimiter {
    pub fn new(capacity: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            window,
            clock,
        }
    }

    /// Take one token for this IP. Returns false when the bucket is empty,
    /// i.e. the caller must be refused.
    pub fn consume(&self, ip: &str) -> bool {
        let now = self.clock.now();
        let mut entry = self
            .buckets
            .entry(ip.to_string())
            .or_insert_with(|| TokenBucket {
                tokens: self.capacity,
                window_started_at: now,
            });
        let bucket = entry.value_mut();

        if now - bucket.window_started_at >= self.window {
            bucket.tokens = self.capacity;
            bucket.window_started_at = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Drop the bucket for this IP, forgiving its consumed tokens. Called
    /// after a successful login.
    pub fn reset(&self, ip: &str) {
        self.buckets.remove(ip);
    }
}
