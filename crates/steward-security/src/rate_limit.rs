use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Build the canonical bucket key for an operation scoped to a tenant,
/// e.g. `orchestrator:acme`.
pub fn rate_key(operation: &str, organization_id: &str) -> String {
    format!("{operation}:{organization_id}")
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter keyed by `(operation, organization)` strings.
///
/// Buckets refill continuously based on elapsed wall-clock time since the
/// last update; there is no timer thread. All read-modify-write cycles on a
/// bucket happen under one lock, so concurrent runs sharing a key cannot
/// race.
pub struct RateLimiter {
    max_tokens: f64,
    refill_rate: f64, // tokens per second
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    /// - `max_tokens`: maximum burst size
    /// - `refill_rate`: tokens added per second
    pub fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            max_tokens,
            refill_rate,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// A limiter allowing `limit` requests per `window`, refilling evenly
    /// across the window.
    pub fn per_window(limit: u32, window: Duration) -> Self {
        Self::new(f64::from(limit), f64::from(limit) / window.as_secs_f64())
    }

    /// Try to consume one token for the given key.
    /// Returns `true` if allowed, `false` if rate limited.
    pub async fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    /// Same as [`check`](Self::check) with an explicit clock reading, so
    /// refill behavior is testable without sleeping.
    pub async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        // Refill based on elapsed time, capped at the burst size
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens =
            (bucket.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.max_tokens);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            warn!(key = %key, "rate limit exhausted");
            false
        }
    }

    /// Remove buckets with no activity for the given duration.
    pub async fn cleanup(&self, max_idle: Duration) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) < max_idle);
    }
}
