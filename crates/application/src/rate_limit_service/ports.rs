use async_trait::async_trait;
use chainaudit_core::AppResult;
use chrono::{DateTime, Utc};

/// Repository port for rate limit counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Counts one request for `key` and returns the state of its window.
    ///
    /// A window that has expired is restarted with a count of one.
    async fn record_attempt(
        &self,
        key: &str,
        window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo>;

    /// Removes windows that started before `before`.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Counter state of the active window for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptInfo {
    /// Requests counted in the current window, including this one.
    pub attempt_count: i32,
    /// When the current window started.
    pub window_started_at: DateTime<Utc>,
}
