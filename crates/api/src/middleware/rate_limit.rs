//! Keyed token bucket limits for credential issuance and intake.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens restored per second
    pub rate: u32,
    /// Bucket capacity; a fresh key may spend this many at once
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: 10000,
            burst: 50000,
        }
    }
}

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl Bucket {
    fn full(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            tokens: f64::from(config.burst),
            refilled_at: now,
        }
    }

    fn take(&mut self, config: &RateLimitConfig, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.refilled_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * f64::from(config.rate)).min(f64::from(config.burst));
        self.refilled_at = now;

        if self.tokens < 1.0 {
            return false;
        }
        self.tokens -= 1.0;
        true
    }
}

/// One token bucket per key (client address or access token).
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Spend one token from `key`'s bucket. False when it is empty.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        match buckets.get_mut(key) {
            Some(bucket) => bucket.take(&self.config, now),
            None => {
                let mut bucket = Bucket::full(&self.config, now);
                let allowed = bucket.take(&self.config, now);
                buckets.insert(key.to_string(), bucket);
                allowed
            }
        }
    }

    /// Seconds until a drained bucket holds a token again.
    pub fn retry_after_secs(&self) -> u64 {
        match self.config.rate {
            0 => 60,
            rate => (1.0 / f64::from(rate)).ceil().max(1.0) as u64,
        }
    }

    /// Forget keys idle for at least `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets
            .lock()
            .retain(|_, bucket| now.saturating_duration_since(bucket.refilled_at) < max_age);
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().len()
    }
}

pub type SharedRateLimiter = Arc<RateLimiter>;
