//! A pluggable pre-handler rate-limit hook. The default is a no-op; the
//! reference `TokenBucketLimiter` is provided for operators who want one,
//! but nothing wires it in automatically.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Outcome of a rate-limit check: allowed, or rejected with a retry-after
/// hint in seconds.
pub trait RateLimitHook: Send + Sync {
    fn check(&self, ip: IpAddr) -> RateLimitDecision;
}

pub enum RateLimitDecision {
    Allow,
    Reject { retry_after_secs: u64 },
}

/// Default hook: never rejects. Matches the relay's "no rate limiting
/// unless an operator opts in" stance.
pub struct NoopRateLimiter;

impl RateLimitHook for NoopRateLimiter {
    fn check(&self, _ip: IpAddr) -> RateLimitDecision {
        RateLimitDecision::Allow
    }
}

#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    pub limit: u32,
    pub window_secs: u64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            limit: 60,
            window_secs: 60,
        }
    }
}

struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

impl Bucket {
    fn new(limit: u32) -> Self {
        Self {
            tokens: limit,
            last_refill: Instant::now(),
        }
    }

    fn check(&mut self, limit: u32, window: Duration) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        if elapsed >= window {
            self.tokens = limit;
        } else {
            let refill = (limit as f64 * elapsed.as_secs_f64() / window.as_secs_f64()) as u32;
            self.tokens = (self.tokens + refill).min(limit);
        }
        self.last_refill = now;

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}

/// A simple per-IP token bucket, offered as a reference implementation of
/// `RateLimitHook` — not enabled by default.
pub struct TokenBucketLimiter {
    buckets: Arc<DashMap<IpAddr, Mutex<Bucket>>>,
    config: TokenBucketConfig,
}

impl TokenBucketLimiter {
    pub fn new(config: TokenBucketConfig) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            config,
        }
    }
}

impl RateLimitHook for TokenBucketLimiter {
    fn check(&self, ip: IpAddr) -> RateLimitDecision {
        let window = Duration::from_secs(self.config.window_secs);
        let entry = self
            .buckets
            .entry(ip)
            .or_insert_with(|| Mutex::new(Bucket::new(self.config.limit)));

        // Rate-limit checks are on the hot path of every request; use
        // try_lock rather than making this hook async.
        let mut bucket = match entry.try_lock() {
            Ok(guard) => guard,
            Err(_) => return RateLimitDecision::Allow,
        };

        if bucket.check(self.config.limit, window) {
            RateLimitDecision::Allow
        } else {
            RateLimitDecision::Reject {
                retry_after_secs: self.config.window_secs,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_never_rejects() {
        let limiter = NoopRateLimiter;
        for _ in 0..1000 {
            assert!(matches!(
                limiter.check("127.0.0.1".parse().unwrap()),
                RateLimitDecision::Allow
            ));
        }
    }

    #[test]
    fn token_bucket_rejects_once_exhausted() {
        let limiter = TokenBucketLimiter::new(TokenBucketConfig {
            limit: 3,
            window_secs: 60,
        });
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(matches!(limiter.check(ip), RateLimitDecision::Allow));
        }
        assert!(matches!(
            limiter.check(ip),
            RateLimitDecision::Reject { .. }
        ));
    }

    #[test]
    fn token_bucket_tracks_ips_independently() {
        let limiter = TokenBucketLimiter::new(TokenBucketConfig {
            limit: 1,
            window_secs: 60,
        });
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(matches!(limiter.check(a), RateLimitDecision::Allow));
        assert!(matches!(limiter.check(b), RateLimitDecision::Allow));
        assert!(matches!(limiter.check(a), RateLimitDecision::Reject { .. }));
    }
}
