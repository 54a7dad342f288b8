//! One continuous-refill token bucket per plugin id. Unlike the sliding
//! window a request-per-window limiter would use, a bucket never needs to
//! remember individual request timestamps — only its current level and the
//! instant it was last topped up.

use dashmap::DashMap;
use std::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Guards public/verify-tier routes. `owner`-tier routes bypass the
/// limiter entirely (enforced by the caller, not this type).
pub struct RateLimiter {
    max_tokens: f64,
    refill_per_second: f64,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(max_tokens: f64, refill_per_second: f64) -> Self {
        Self {
            max_tokens,
            refill_per_second,
            buckets: DashMap::new(),
        }
    }

    /// Refills `plugin_id`'s bucket for elapsed time, then admits iff at
    /// least one token is available, consuming it on admission.
    pub fn allow(&self, plugin_id: &str) -> bool {
        let now = Instant::now();
        let mut bucket = self.buckets.entry(plugin_id.to_string()).or_insert_with(|| Bucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.max_tokens);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_bucket_admits_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(100.0, 100.0 / 60.0);
        for _ in 0..100 {
            assert!(limiter.allow("p"));
        }
        assert!(!limiter.allow("p"));
    }

    #[test]
    fn separate_plugin_ids_have_independent_buckets() {
        let limiter = RateLimiter::new(1.0, 0.0);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn refill_is_capped_at_max_tokens() {
        let limiter = RateLimiter::new(5.0, 1_000_000.0);
        limiter.allow("p");
        std::thread::sleep(std::time::Duration::from_millis(10));
        for _ in 0..5 {
            assert!(limiter.allow("p"));
        }
        assert!(!limiter.allow("p"));
    }
}
