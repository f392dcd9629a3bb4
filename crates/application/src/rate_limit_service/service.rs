use std::sync::Arc;

use chainaudit_core::{AppError, AppResult};
use chrono::{TimeDelta, Utc};
use tracing::warn;

use super::config::RateLimitRule;
use super::ports::RateLimitRepository;

/// Application service enforcing request budgets.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Counts a request from `key` against `rule`.
    ///
    /// Returns `Err(AppError::RateLimited)` once the window budget is spent.
    /// `key` is usually the client IP address.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, key: &str) -> AppResult<()> {
        let composite_key = format!("{}:{key}", rule.category);
        let info = self
            .repository
            .record_attempt(&composite_key, rule.window_seconds)
            .await?;

        if info.attempt_count > rule.max_attempts {
            let retry_at = info.window_started_at + TimeDelta::seconds(rule.window_seconds);
            warn!(
                category = %rule.category,
                client = key,
                attempt_count = info.attempt_count,
                "rate limit exceeded"
            );

            return Err(AppError::RateLimited(format!(
                "too many requests, please try again after {}",
                retry_at.to_rfc3339()
            )));
        }

        Ok(())
    }

    /// Removes counters older than a day.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - TimeDelta::hours(24);
        self.repository.cleanup_expired(cutoff).await
    }
}
