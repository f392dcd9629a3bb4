//! PostgreSQL-backed hash-chained ledger using the `audit_ledger` table.
//!
//! Integrity halts live in `ledger_halts` so every process appending to the
//! same database observes them.

use async_trait::async_trait;
use chainaudit_application::{LedgerRepository, appends_halted_error};
use chainaudit_core::{AppError, AppResult};
use chainaudit_domain::{ChainLink, LedgerEntry};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::postgres_errors::{UNIQUE_VIOLATION, database_code, storage_error};

/// Advisory lock key serializing ledger appends across all connections.
const LEDGER_APPEND_LOCK_KEY: i64 = 0x4348_4149_4E4C_4447;

const ACTIVE_HALT_QUERY: &str = r#"
    SELECT reason
    FROM ledger_halts
    WHERE cleared_at IS NULL
    LIMIT 1
"#;

/// PostgreSQL implementation of the ledger repository port.
#[derive(Clone)]
pub struct PostgresLedgerRepository {
    pool: PgPool,
}

impl PostgresLedgerRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LedgerRow {
    seq: i64,
    event_id: String,
    prev_hash: Option<String>,
    hash: String,
    finding: Json<Value>,
    finding_canonical: String,
    occurred_at: DateTime<Utc>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        Self {
            seq: row.seq,
            event_id: row.event_id,
            prev_hash: row.prev_hash,
            hash: row.hash,
            finding: row.finding.0,
            finding_canonical: row.finding_canonical,
            occurred_at: row.occurred_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TailRow {
    seq: i64,
    hash: String,
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn append(&self, event_id: &str, finding: Value) -> AppResult<ChainLink> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| storage_error("begin ledger transaction", &error))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(LEDGER_APPEND_LOCK_KEY)
            .execute(&mut *transaction)
            .await
            .map_err(|error| storage_error("acquire ledger append lock", &error))?;

        let halt = sqlx::query_scalar::<_, String>(ACTIVE_HALT_QUERY)
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| storage_error("check ledger halt", &error))?;

        if let Some(reason) = halt {
            return Err(appends_halted_error(reason.as_str()));
        }

        let existing = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT seq
            FROM audit_ledger
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| storage_error("check ledger event uniqueness", &error))?;

        if existing.is_some() {
            return Err(AppError::DuplicateEvent(event_id.to_owned()));
        }

        let tail = sqlx::query_as::<_, TailRow>(
            r#"
            SELECT seq, hash
            FROM audit_ledger
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| storage_error("read ledger tail", &error))?;

        let (seq, prev_hash) = match tail {
            Some(tail) => (tail.seq + 1, Some(tail.hash)),
            None => (1, None),
        };
        let entry = LedgerEntry::seal(seq, event_id, prev_hash, finding, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO audit_ledger (
                seq,
                event_id,
                prev_hash,
                hash,
                finding,
                finding_canonical,
                occurred_at
            )
            VALUES ($1, $2, $3, $4, $5::jsonb, $6, $7)
            "#,
        )
        .bind(entry.seq)
        .bind(entry.event_id.as_str())
        .bind(entry.prev_hash.as_deref())
        .bind(entry.hash.as_str())
        .bind(entry.finding_canonical.as_str())
        .bind(entry.finding_canonical.as_str())
        .bind(entry.occurred_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_insert_error(event_id, &error))?;

        transaction
            .commit()
            .await
            .map_err(|error| storage_error("commit ledger append", &error))?;

        debug!(seq = entry.seq, event_id, "ledger row committed");
        Ok(entry.link())
    }

    async fn last_hash(&self) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT hash
            FROM audit_ledger
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| storage_error("read ledger tail hash", &error))
    }

    async fn tail(&self, limit: usize) -> AppResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT seq, event_id, prev_hash, hash, finding, finding_canonical, occurred_at
            FROM audit_ledger
            ORDER BY seq DESC
            LIMIT $1
            "#,
        )
        .bind(page_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| storage_error("list ledger tail", &error))?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }

    async fn entries_in_range(
        &self,
        from_seq: i64,
        to_seq: Option<i64>,
        limit: usize,
    ) -> AppResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT seq, event_id, prev_hash, hash, finding, finding_canonical, occurred_at
            FROM audit_ledger
            WHERE seq >= $1
              AND ($2::BIGINT IS NULL OR seq <= $2)
            ORDER BY seq ASC
            LIMIT $3
            "#,
        )
        .bind(from_seq)
        .bind(to_seq)
        .bind(page_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| storage_error("read ledger range", &error))?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }

    async fn find_by_seq(&self, seq: i64) -> AppResult<Option<LedgerEntry>> {
        let row = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT seq, event_id, prev_hash, hash, finding, finding_canonical, occurred_at
            FROM audit_ledger
            WHERE seq = $1
            "#,
        )
        .bind(seq)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| storage_error("find ledger row by seq", &error))?;

        Ok(row.map(LedgerEntry::from))
    }

    async fn find_by_event_id(&self, event_id: &str) -> AppResult<Option<LedgerEntry>> {
        let row = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT seq, event_id, prev_hash, hash, finding, finding_canonical, occurred_at
            FROM audit_ledger
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| storage_error("find ledger row by event id", &error))?;

        Ok(row.map(LedgerEntry::from))
    }

    async fn record_halt(&self, reason: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_halts (reason)
            VALUES ($1)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|error| storage_error("record ledger halt", &error))?;

        Ok(())
    }

    async fn active_halt(&self) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>(ACTIVE_HALT_QUERY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| storage_error("read ledger halt", &error))
    }

    async fn clear_halt(&self) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ledger_halts
            SET cleared_at = now()
            WHERE cleared_at IS NULL
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|error| storage_error("clear ledger halt", &error))?;

        Ok(result.rows_affected() > 0)
    }
}

fn page_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn map_insert_error(event_id: &str, error: &sqlx::Error) -> AppError {
    if database_code(error).as_deref() == Some(UNIQUE_VIOLATION) {
        return AppError::DuplicateEvent(event_id.to_owned());
    }

    storage_error("insert ledger row", error)
}

#[cfg(test)]
mod tests;
