use std::collections::HashMap;

use async_trait::async_trait;
use chainaudit_application::{AttemptInfo, RateLimitRepository};
use chainaudit_core::{AppError, AppResult};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

/// Process-local fixed-window counters.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitRepository {
    windows: Mutex<HashMap<String, AttemptInfo>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty counter store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn record_attempt_at(
        &self,
        key: &str,
        window_duration_seconds: i64,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptInfo> {
        if window_duration_seconds <= 0 {
            return Err(AppError::Validation(
                "rate limit window must be at least one second".to_owned(),
            ));
        }

        let window = TimeDelta::seconds(window_duration_seconds);
        let mut windows = self.windows.lock().await;
        let info = windows
            .entry(key.to_owned())
            .and_modify(|info| {
                if info.window_started_at + window < now {
                    info.attempt_count = 1;
                    info.window_started_at = now;
                } else {
                    info.attempt_count = info.attempt_count.saturating_add(1);
                }
            })
            .or_insert(AttemptInfo {
                attempt_count: 1,
                window_started_at: now,
            });

        Ok(info.clone())
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn record_attempt(
        &self,
        key: &str,
        window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo> {
        self.record_attempt_at(key, window_duration_seconds, Utc::now())
            .await
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut windows = self.windows.lock().await;
        let previous = windows.len();
        windows.retain(|_, info| info.window_started_at >= before);

        Ok(u64::try_from(previous - windows.len()).unwrap_or(u64::MAX))
    }
}
