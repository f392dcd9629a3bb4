use async_trait::async_trait;
use chainaudit_core::{AppError, AppResult};
use chainaudit_domain::{ChainLink, LedgerEntry};
use serde_json::Value;

/// Repository port for the append-only hash-chained ledger.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Appends a finding for `event_id` as the new chain tail.
    ///
    /// Reading the current tail, hashing and inserting happen as one
    /// serialized operation. Fails with `ChainIntegrity` while a halt is
    /// active, with `DuplicateEvent` when the event is already recorded and
    /// with `TransientStorage` when the store is unavailable.
    async fn append(&self, event_id: &str, finding: Value) -> AppResult<ChainLink>;

    /// Returns the hash of the current tail, if any.
    async fn last_hash(&self) -> AppResult<Option<String>>;

    /// Returns the most recent entries, newest first.
    async fn tail(&self, limit: usize) -> AppResult<Vec<LedgerEntry>>;

    /// Returns up to `limit` entries with `from_seq <= seq <= to_seq` in
    /// ascending order. `to_seq = None` reads up to the tail.
    async fn entries_in_range(
        &self,
        from_seq: i64,
        to_seq: Option<i64>,
        limit: usize,
    ) -> AppResult<Vec<LedgerEntry>>;

    /// Finds the entry with the given sequence number.
    async fn find_by_seq(&self, seq: i64) -> AppResult<Option<LedgerEntry>>;

    /// Finds the entry recorded for an event.
    async fn find_by_event_id(&self, event_id: &str) -> AppResult<Option<LedgerEntry>>;

    /// Persists an integrity halt shared by every writer of this ledger.
    ///
    /// Recording a halt while one is already active keeps the first reason.
    async fn record_halt(&self, reason: &str) -> AppResult<()>;

    /// Returns the reason of the active halt, if any.
    async fn active_halt(&self) -> AppResult<Option<String>>;

    /// Clears the active halt. Returns whether one was active.
    async fn clear_halt(&self) -> AppResult<bool>;
}

/// Error returned by `append` while a halt is active.
#[must_use]
pub fn appends_halted_error(reason: &str) -> AppError {
    AppError::ChainIntegrity(format!("ledger appends are halted: {reason}"))
}
