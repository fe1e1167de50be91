//! Redirect-path rate limiting
//!
//! Limits are enforced per client identifier over a sliding window backed
//! by Redis. The service wrapper never fails a redirect: backend errors
//! and slow checks both degrade to an open decision.

pub mod redis;

pub use redis::RedisRateLimiter;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch milliseconds when the current window expires. Zero when the
    /// backend was unavailable and the request was admitted anyway.
    pub reset_at_ms: i64,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, identifier: &str) -> Result<RateLimitDecision>;
}

/// Limiter used when no Redis backend is configured. Admits everything.
pub struct NoopRateLimiter {
    limit: u32,
}

impl NoopRateLimiter {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }
}

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn check(&self, _identifier: &str) -> Result<RateLimitDecision> {
        Ok(RateLimitDecision {
            admitted: true,
            limit: self.limit,
            remaining: self.limit,
            reset_at_ms: 0,
        })
    }
}

/// Fail-open wrapper around a [`RateLimiter`] backend.
///
/// A broken or slow limiter must not take the redirect path down with it,
/// so `admit` swallows backend errors and bounds the check with a timeout.
#[derive(Clone)]
pub struct RateLimitService {
    limiter: Arc<dyn RateLimiter>,
    limit: u32,
    timeout: Duration,
}

impl RateLimitService {
    pub fn new(limiter: Arc<dyn RateLimiter>, limit: u32, timeout: Duration) -> Self {
        Self {
            limiter,
            limit,
            timeout,
        }
    }

    fn open(&self) -> RateLimitDecision {
        RateLimitDecision {
            admitted: true,
            limit: self.limit,
            remaining: self.limit,
            reset_at_ms: 0,
        }
    }

    pub async fn admit(&self, identifier: &str) -> RateLimitDecision {
        match tokio::time::timeout(self.timeout, self.limiter.check(identifier)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(err)) => {
                tracing::warn!(
                    identifier = %identifier,
                    error = %err,
                    "Rate limit check failed, admitting request"
                );
                self.open()
            }
            Err(_) => {
                tracing::warn!(
                    identifier = %identifier,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Rate limit check timed out, admitting request"
                );
                self.open()
            }
        }
    }
}
