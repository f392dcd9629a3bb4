//! Redis-backed rate limit counters for multi-instance deployments.

use async_trait::async_trait;
use chainaudit_application::{AttemptInfo, RateLimitRepository};
use chainaudit_core::{AppError, AppResult};
use chrono::{DateTime, TimeZone, Utc};
use redis::Script;

const RECORD_ATTEMPT_SCRIPT: &str = r#"
local key = KEYS[1]
local window = tonumber(ARGV[1])
local now_epoch = tonumber(ARGV[2])

local attempts = redis.call('INCR', key)
local remaining = redis.call('TTL', key)

if remaining < 0 then
  redis.call('EXPIRE', key, window)
  remaining = window
end

return {attempts, now_epoch - (window - remaining)}
"#;

/// Redis implementation of the rate limit repository port.
///
/// Windows expire through key TTLs, so `cleanup_expired` has nothing to do.
#[derive(Clone)]
pub struct RedisRateLimitRepository {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRateLimitRepository {
    /// Creates a repository; every counter key is namespaced by `key_prefix`.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }
}

#[async_trait]
impl RateLimitRepository for RedisRateLimitRepository {
    async fn record_attempt(
        &self,
        key: &str,
        window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo> {
        let window = u32::try_from(window_duration_seconds)
            .ok()
            .filter(|window| *window > 0)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "rate limit window must be between 1 and {} seconds, got {window_duration_seconds}",
                    u32::MAX
                ))
            })?;

        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        let reply: (i64, i64) = Script::new(RECORD_ATTEMPT_SCRIPT)
            .key(self.key_for(key))
            .arg(window)
            .arg(Utc::now().timestamp())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("redis rate limit script failed for '{key}': {error}"))
            })?;

        attempt_from_reply(reply)
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        Ok(0)
    }
}

fn attempt_from_reply((attempts, window_started_epoch): (i64, i64)) -> AppResult<AttemptInfo> {
    let attempt_count = i32::try_from(attempts).map_err(|error| {
        AppError::Internal(format!("redis attempt count {attempts} out of range: {error}"))
    })?;
    let window_started_at = Utc
        .timestamp_opt(window_started_epoch, 0)
        .single()
        .ok_or_else(|| {
            AppError::Internal(format!(
                "redis returned an invalid window start: {window_started_epoch}"
            ))
        })?;

    Ok(AttemptInfo {
        attempt_count,
        window_started_at,
    })
}
