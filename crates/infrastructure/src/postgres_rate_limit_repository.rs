//! Fixed-window request counters in the `api_rate_limits` table.
//!
//! Each `(category, client_key)` row carries its own window end, so the
//! general and ledger budgets can use different window lengths without
//! sharing a row.

use async_trait::async_trait;
use chainaudit_application::{AttemptInfo, RateLimitRepository};
use chainaudit_core::AppResult;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::postgres_errors::storage_error;

/// Category used for keys that carry no `category:` prefix.
const UNCATEGORIZED: &str = "default";

/// PostgreSQL implementation of the rate limit repository port.
#[derive(Clone)]
pub struct PostgresRateLimitRepository {
    pool: PgPool,
}

impl PostgresRateLimitRepository {
    /// Creates a repository over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct WindowRow {
    attempt_count: i32,
    window_started_at: DateTime<Utc>,
}

#[async_trait]
impl RateLimitRepository for PostgresRateLimitRepository {
    async fn record_attempt(
        &self,
        key: &str,
        window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo> {
        let (category, client_key) = split_key(key);

        let row = sqlx::query_as::<_, WindowRow>(
            r#"
            INSERT INTO api_rate_limits AS window_row (
                category,
                client_key,
                window_started_at,
                window_ends_at,
                attempt_count
            )
            VALUES ($1, $2, now(), now() + $3::BIGINT * INTERVAL '1 second', 1)
            ON CONFLICT (category, client_key) DO UPDATE
            SET
                attempt_count = CASE
                    WHEN window_row.window_ends_at <= now() THEN 1
                    ELSE window_row.attempt_count + 1
                END,
                window_started_at = CASE
                    WHEN window_row.window_ends_at <= now() THEN now()
                    ELSE window_row.window_started_at
                END,
                window_ends_at = CASE
                    WHEN window_row.window_ends_at <= now() THEN EXCLUDED.window_ends_at
                    ELSE window_row.window_ends_at
                END
            RETURNING attempt_count, window_started_at
            "#,
        )
        .bind(category)
        .bind(client_key)
        .bind(window_duration_seconds.max(1))
        .fetch_one(&self.pool)
        .await
        .map_err(|error| storage_error("count rate limited request", &error))?;

        Ok(AttemptInfo {
            attempt_count: row.attempt_count,
            window_started_at: row.window_started_at,
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM api_rate_limits
            WHERE window_started_at < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| storage_error("remove stale rate limit windows", &error))?;

        Ok(result.rows_affected())
    }
}

/// Splits a `category:client` key built by the rate limit service.
///
/// Client keys may contain colons (IPv6), so only the first one separates.
fn split_key(key: &str) -> (&str, &str) {
    key.split_once(':').unwrap_or((UNCATEGORIZED, key))
}
