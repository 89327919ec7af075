//! Rate limiting and cross-cutting guard utilities for Steward.
//!
//! # Main types
//!
//! - [`RateLimiter`] — Per-key token bucket guarding request volume.
//! - [`RetryPolicy`] — Exponential-backoff retry configuration.
//! - [`guard::with_timeout`] — Bounded-time wrapper for external calls.
//! - [`guard::retry`] — Retry combinator for transient failures.

/// Timeout wrapper, retry-with-backoff, size caps, and input cleaning.
pub mod guard;
/// Per-key token bucket rate limiter.
pub mod rate_limit;

pub use guard::{retry, sanitize_query, with_timeout, RetryPolicy};
pub use rate_limit::{rate_key, RateLimiter};
