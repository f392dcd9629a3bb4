use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chainaudit_core::{AppError, AppResult};
use chainaudit_domain::{ChainLink, LedgerEntry};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::ledger_ports::{LedgerRepository, appends_halted_error};

/// Vec-backed ledger with failure injection for service tests.
#[derive(Default)]
pub(crate) struct FakeLedgerRepository {
    entries: Mutex<Vec<LedgerEntry>>,
    append_delay: Option<Duration>,
    failing_appends: AtomicU32,
    append_calls: AtomicU32,
    halt: Mutex<Option<String>>,
}

impl FakeLedgerRepository {
    pub(crate) fn with_append_delay(delay: Duration) -> Self {
        Self {
            append_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Makes the next `count` appends fail with a transient error.
    pub(crate) fn failing_appends(count: u32) -> Self {
        Self {
            failing_appends: AtomicU32::new(count),
            ..Self::default()
        }
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub(crate) async fn last_entry(&self) -> Option<LedgerEntry> {
        self.entries.lock().await.last().cloned()
    }

    pub(crate) async fn snapshot(&self) -> Vec<LedgerEntry> {
        self.entries.lock().await.clone()
    }

    pub(crate) fn append_calls(&self) -> u32 {
        self.append_calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn tamper_finding(&self, seq: i64, finding: Value) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.iter_mut().find(|entry| entry.seq == seq) {
            entry.finding = finding;
        }
    }
}

#[async_trait]
impl LedgerRepository for FakeLedgerRepository {
    async fn append(&self, event_id: &str, finding: Value) -> AppResult<ChainLink> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.append_delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self
            .failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if should_fail {
            return Err(AppError::TransientStorage(
                "connection reset by peer".to_owned(),
            ));
        }

        let mut entries = self.entries.lock().await;
        if let Some(reason) = self.halt.lock().await.as_deref() {
            return Err(appends_halted_error(reason));
        }
        if entries.iter().any(|entry| entry.event_id == event_id) {
            return Err(AppError::DuplicateEvent(event_id.to_owned()));
        }

        let seq = entries.last().map_or(1, |entry| entry.seq + 1);
        let prev_hash = entries.last().map(|entry| entry.hash.clone());
        let entry = LedgerEntry::seal(seq, event_id, prev_hash, finding, Utc::now());
        let link = entry.link();
        entries.push(entry);
        Ok(link)
    }

    async fn last_hash(&self) -> AppResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .await
            .last()
            .map(|entry| entry.hash.clone()))
    }

    async fn tail(&self, limit: usize) -> AppResult<Vec<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn entries_in_range(
        &self,
        from_seq: i64,
        to_seq: Option<i64>,
        limit: usize,
    ) -> AppResult<Vec<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|entry| entry.seq >= from_seq && to_seq.is_none_or(|to| entry.seq <= to))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_seq(&self, seq: i64) -> AppResult<Option<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .find(|entry| entry.seq == seq)
            .cloned())
    }

    async fn find_by_event_id(&self, event_id: &str) -> AppResult<Option<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .find(|entry| entry.event_id == event_id)
            .cloned())
    }

    async fn record_halt(&self, reason: &str) -> AppResult<()> {
        self.halt.lock().await.get_or_insert_with(|| reason.to_owned());
        Ok(())
    }

    async fn active_halt(&self) -> AppResult<Option<String>> {
        Ok(self.halt.lock().await.clone())
    }

    async fn clear_halt(&self) -> AppResult<bool> {
        Ok(self.halt.lock().await.take().is_some())
    }
}
