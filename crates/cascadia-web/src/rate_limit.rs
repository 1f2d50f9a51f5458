//! Per-client token bucket limiter.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use cascadia_config::RateLimit;
use tokio::sync::Mutex;

/// Buckets beyond this count trigger a sweep of idle ones.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// `limit.requests` tokens per client, refilled continuously over
/// `limit.period`.
#[derive(Debug)]
pub struct RateLimiter {
    limit: RateLimit,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self { limit, buckets: Mutex::new(HashMap::new()) }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    pub async fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now()).await
    }

    async fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let capacity = f64::from(self.limit.requests);
        let per_sec = capacity / self.limit.period.as_secs_f64();

        let mut buckets = self.buckets.lock().await;
        if buckets.len() >= PRUNE_THRESHOLD {
            // An idle bucket refills completely within one period.
            let period = self.limit.period;
            buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) < period);
        }

        let bucket = buckets
            .entry(client.to_string())
            .or_insert(Bucket { tokens: capacity, last_refill: now });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * per_sec).min(capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateDecision::Allowed
        } else {
            let wait = (1.0 - bucket.tokens) / per_sec;
            RateDecision::Limited { retry_after: Duration::from_secs_f64(wait) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_capacity_then_limits() {
        let limiter = RateLimiter::new(RateLimit::per_minute(3));
        let now = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.check_at("1.2.3.4", now).await, RateDecision::Allowed);
        }
        match limiter.check_at("1.2.3.4", now).await {
            RateDecision::Limited { retry_after } => {
                assert!(retry_after > Duration::from_secs(19) && retry_after <= Duration::from_secs(21));
            }
            RateDecision::Allowed => panic!("fourth request should be limited"),
        }
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(RateLimit::per_minute(1));
        let now = Instant::now();
        assert_eq!(limiter.check_at("a", now).await, RateDecision::Allowed);
        assert_eq!(limiter.check_at("b", now).await, RateDecision::Allowed);
        assert!(matches!(limiter.check_at("a", now).await, RateDecision::Limited { .. }));
    }

    #[tokio::test]
    async fn test_tokens_refill_over_time() {
        let limiter = RateLimiter::new(RateLimit::per_minute(2));
        let start = Instant::now();
        limiter.check_at("c", start).await;
        limiter.check_at("c", start).await;
        assert!(matches!(limiter.check_at("c", start).await, RateDecision::Limited { .. }));

        let later = start + Duration::from_secs(31);
        assert_eq!(limiter.check_at("c", later).await, RateDecision::Allowed);
    }
}
