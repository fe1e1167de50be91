use crate::ratelimit::{RateLimitDecision, RateLimiter};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use redis::{Client, Script};
use std::time::Duration;

const KEY_PREFIX: &str = "qrly:redirect";

/// Sliding-window counter over two fixed windows. The current window is
/// incremented unconditionally, so a denied request still consumes a slot.
/// The previous window's count is weighted by how much of it still overlaps
/// the sliding window.
///
/// KEYS[1] = current window counter, KEYS[2] = previous window counter.
/// ARGV[1] = limit, ARGV[2] = window length (ms), ARGV[3] = elapsed ms in
/// the current window. Returns {admitted (0/1), remaining}.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[2] * 2)
end
local previous = tonumber(redis.call('GET', KEYS[2]) or '0')
local limit = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local elapsed = tonumber(ARGV[3])
local carried = math.floor(previous * (window - elapsed) / window)
local used = current + carried
local remaining = limit - used
if remaining < 0 then
    remaining = 0
end
if used > limit then
    return {0, remaining}
end
return {1, remaining}
"#;

pub struct RedisRateLimiter {
    client: Client,
    script: Script,
    limit: u32,
    window_ms: i64,
}

impl RedisRateLimiter {
    /// Does not connect; the client is lazy and every check fetches its own
    /// multiplexed connection so a Redis outage at startup is no worse than
    /// one at runtime.
    pub fn new(url: &str, limit: u32, window: Duration) -> Result<Self> {
        let client = Client::open(url)?;

        Ok(Self {
            client,
            script: Script::new(SLIDING_WINDOW_SCRIPT),
            limit,
            window_ms: window.as_millis() as i64,
        })
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, identifier: &str) -> Result<RateLimitDecision> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let now = Utc::now().timestamp_millis();
        let start = window_start(now, self.window_ms);
        let current_key = format!("{}:{}:{}", KEY_PREFIX, identifier, start);
        let previous_key = format!("{}:{}:{}", KEY_PREFIX, identifier, start - self.window_ms);

        let (admitted, remaining): (i64, i64) = self
            .script
            .key(&current_key)
            .key(&previous_key)
            .arg(self.limit)
            .arg(self.window_ms)
            .arg(now - start)
            .invoke_async(&mut conn)
            .await?;

        Ok(RateLimitDecision {
            admitted: admitted == 1,
            limit: self.limit,
            remaining: remaining.max(0) as u32,
            reset_at_ms: start + self.window_ms,
        })
    }
}

fn window_start(now_ms: i64, window_ms: i64) -> i64 {
    now_ms - now_ms.rem_euclid(window_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_aligns_to_window_boundary() {
        let window = 60_000;

        assert_eq!(window_start(1_700_000_012_345, window), 1_699_999_980_000);
        assert_eq!(window_start(1_699_999_980_000, window), 1_699_999_980_000);
        assert_eq!(window_start(1_700_000_039_999, window), 1_699_999_980_000);
        assert_eq!(window_start(1_700_000_040_000, window), 1_700_000_040_000);
    }
}
