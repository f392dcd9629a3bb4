use std::collections::HashMap;

use async_trait::async_trait;
use chainaudit_application::{LedgerRepository, appends_halted_error};
use chainaudit_core::{AppError, AppResult};
use chainaudit_domain::{ChainLink, LedgerEntry};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    seq_by_event_id: HashMap<String, i64>,
    halt: Option<String>,
}

impl LedgerState {
    fn get(&self, seq: i64) -> Option<&LedgerEntry> {
        let index = usize::try_from(seq.checked_sub(1)?).ok()?;
        self.entries.get(index)
    }
}

/// Process-local ledger for development and single-node deployments.
///
/// Appends are serialized by one async mutex that owns every row.
#[derive(Debug, Default)]
pub struct InMemoryLedgerRepository {
    state: Mutex<LedgerState>,
}

impl InMemoryLedgerRepository {
    /// Creates an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn append(&self, event_id: &str, finding: Value) -> AppResult<ChainLink> {
        let mut state = self.state.lock().await;
        if let Some(reason) = state.halt.as_deref() {
            return Err(appends_halted_error(reason));
        }
        if state.seq_by_event_id.contains_key(event_id) {
            return Err(AppError::DuplicateEvent(event_id.to_owned()));
        }

        let (seq, prev_hash) = match state.entries.last() {
            Some(tail) => (tail.seq + 1, Some(tail.hash.clone())),
            None => (1, None),
        };
        let entry = LedgerEntry::seal(seq, event_id, prev_hash, finding, Utc::now());
        let link = entry.link();

        state.seq_by_event_id.insert(event_id.to_owned(), seq);
        state.entries.push(entry);
        Ok(link)
    }

    async fn last_hash(&self) -> AppResult<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.entries.last().map(|entry| entry.hash.clone()))
    }

    async fn tail(&self, limit: usize) -> AppResult<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state.entries.iter().rev().take(limit).cloned().collect())
    }

    async fn entries_in_range(
        &self,
        from_seq: i64,
        to_seq: Option<i64>,
        limit: usize,
    ) -> AppResult<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        let start = usize::try_from(from_seq.saturating_sub(1)).unwrap_or(0);

        Ok(state
            .entries
            .iter()
            .skip(start)
            .take_while(|entry| to_seq.is_none_or(|to_seq| entry.seq <= to_seq))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_seq(&self, seq: i64) -> AppResult<Option<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state.get(seq).cloned())
    }

    async fn find_by_event_id(&self, event_id: &str) -> AppResult<Option<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .seq_by_event_id
            .get(event_id)
            .and_then(|seq| state.get(*seq))
            .cloned())
    }

    async fn record_halt(&self, reason: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.halt.get_or_insert_with(|| reason.to_owned());
        Ok(())
    }

    async fn active_halt(&self) -> AppResult<Option<String>> {
        Ok(self.state.lock().await.halt.clone())
    }

    async fn clear_halt(&self) -> AppResult<bool> {
        Ok(self.state.lock().await.halt.take().is_some())
    }
}
