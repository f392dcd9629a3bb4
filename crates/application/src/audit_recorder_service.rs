use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chainaudit_core::{AppError, AppResult};
use chainaudit_domain::{
    AuditFinding, AuditRecord, ChainVerification, ChainVerifier, Event, LedgerEntry, RiskAnalysis,
    RiskAssessment,
};
use chrono::Utc;
use tracing::{error, info};

use crate::compliance_policy::CompliancePolicy;
use crate::ledger_ports::LedgerRepository;

mod audit_id;

pub use audit_id::generate_audit_id;

/// Default number of entries returned by [`AuditRecorderService::recent_log`].
pub const DEFAULT_AUDIT_LOG_LIMIT: usize = 50;
/// Upper bound for [`AuditRecorderService::recent_log`].
pub const MAX_AUDIT_LOG_LIMIT: usize = 200;
/// Entries fetched per page while verifying the chain.
pub const DEFAULT_VERIFY_PAGE_SIZE: usize = 500;
/// Default bound for a single ledger call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds compliance-tagged audit records and appends them to the ledger.
///
/// A failed chain verification records a halt in the ledger itself, so every
/// recorder writing to that ledger fails with `ChainIntegrity` until the halt
/// is cleared through [`AuditRecorderService::resume_appends`].
#[derive(Clone)]
pub struct AuditRecorderService {
    ledger: Arc<dyn LedgerRepository>,
    compliance_policy: Arc<dyn CompliancePolicy>,
    store_timeout: Duration,
    verify_page_size: usize,
}

impl AuditRecorderService {
    /// Creates a recorder over the given ledger.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        compliance_policy: Arc<dyn CompliancePolicy>,
    ) -> Self {
        Self {
            ledger,
            compliance_policy,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            verify_page_size: DEFAULT_VERIFY_PAGE_SIZE,
        }
    }

    /// Overrides the per-call ledger timeout.
    #[must_use]
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Overrides the verification page size.
    #[must_use]
    pub fn with_verify_page_size(mut self, verify_page_size: usize) -> Self {
        self.verify_page_size = verify_page_size.max(1);
        self
    }

    /// Records an analyzed event as the next ledger entry.
    pub async fn record(&self, event: &Event, analysis: &RiskAnalysis) -> AppResult<AuditRecord> {
        let finding = AuditFinding {
            audit_id: generate_audit_id()?,
            event_id: event.event_id().clone(),
            timestamp: Utc::now(),
            original_event: event.clone(),
            analysis: analysis.clone(),
            compliance: self.compliance_policy.flags_for(event),
            risk_assessment: RiskAssessment::from_analysis(analysis),
        };
        let document = finding.to_document()?;

        let chain_link = self
            .bounded("ledger append", self.ledger.append(event.event_id().as_str(), document))
            .await?;

        info!(
            event_id = %event.event_id(),
            audit_id = %finding.audit_id,
            seq = chain_link.seq,
            hash = %chain_link.hash,
            "audit record appended"
        );

        Ok(AuditRecord {
            finding,
            chain_link,
        })
    }

    /// Loads the record previously stored for an event.
    pub async fn find_recorded(&self, event_id: &str) -> AppResult<Option<AuditRecord>> {
        let entry = self
            .bounded("ledger lookup", self.ledger.find_by_event_id(event_id))
            .await?;

        entry.map(record_from_entry).transpose()
    }

    /// Returns the hash of the current chain tail.
    pub async fn chain_root(&self) -> AppResult<Option<String>> {
        self.bounded("ledger root lookup", self.ledger.last_hash())
            .await
    }

    /// Returns the most recent ledger entries, newest first.
    ///
    /// `limit` defaults to [`DEFAULT_AUDIT_LOG_LIMIT`] and is clamped to
    /// `1..=MAX_AUDIT_LOG_LIMIT`.
    pub async fn recent_log(&self, limit: Option<usize>) -> AppResult<Vec<LedgerEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_AUDIT_LOG_LIMIT)
            .clamp(1, MAX_AUDIT_LOG_LIMIT);

        self.bounded("ledger tail read", self.ledger.tail(limit))
            .await
    }

    /// Walks `from_seq..=to_seq` and checks every link.
    ///
    /// A range starting above 1 is anchored on the entry right before it.
    /// A broken chain halts further appends.
    pub async fn verify_chain(
        &self,
        from_seq: Option<i64>,
        to_seq: Option<i64>,
    ) -> AppResult<ChainVerification> {
        let from_seq = from_seq.unwrap_or(1).max(1);
        if let Some(to_seq) = to_seq
            && to_seq < from_seq
        {
            return Err(AppError::Validation(format!(
                "toSeq ({to_seq}) must not be lower than fromSeq ({from_seq})"
            )));
        }

        let mut verifier = if from_seq == 1 {
            ChainVerifier::from_genesis()
        } else {
            match self
                .bounded("ledger anchor lookup", self.ledger.find_by_seq(from_seq - 1))
                .await?
            {
                Some(anchor) => ChainVerifier::anchored_at(&anchor),
                None => ChainVerifier::broken_at(
                    from_seq - 1,
                    "anchor entry preceding the range is missing",
                ),
            }
        };

        let mut next_seq = from_seq;
        while !verifier.is_broken() {
            let page = self
                .bounded(
                    "ledger range read",
                    self.ledger
                        .entries_in_range(next_seq, to_seq, self.verify_page_size),
                )
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            next_seq = last.seq + 1;
            let short_page = page.len() < self.verify_page_size;

            for entry in &page {
                if !verifier.feed(entry) {
                    break;
                }
            }

            if short_page {
                break;
            }
        }

        let verification = verifier.finish();
        if !verification.valid {
            let reason = format!(
                "entry {} failed verification: {}",
                verification.first_broken_seq.unwrap_or_default(),
                verification.reason.as_deref().unwrap_or("unknown")
            );
            error!(
                first_broken_seq = verification.first_broken_seq,
                reason = %reason,
                "hash chain integrity violation detected, halting appends"
            );
            self.bounded("ledger halt write", self.ledger.record_halt(&reason))
                .await?;
        }

        Ok(verification)
    }

    /// Returns why appends are halted, if they are.
    pub async fn halted_reason(&self) -> AppResult<Option<String>> {
        self.bounded("ledger halt lookup", self.ledger.active_halt())
            .await
    }

    /// Re-verifies the whole chain and clears the halt when it is intact.
    ///
    /// Returns whether a halt was cleared. A chain that still fails
    /// verification stays halted.
    pub async fn resume_appends(&self) -> AppResult<bool> {
        let verification = self.verify_chain(None, None).await?;
        if !verification.valid {
            return Err(AppError::ChainIntegrity(format!(
                "chain still broken at entry {}",
                verification.first_broken_seq.unwrap_or_default()
            )));
        }

        let cleared = self
            .bounded("ledger halt clear", self.ledger.clear_halt())
            .await?;
        if cleared {
            info!(
                entries_checked = verification.entries_checked,
                "ledger halt cleared after successful verification"
            );
        }

        Ok(cleared)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        future: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        tokio::time::timeout(self.store_timeout, future)
            .await
            .map_err(|_| {
                AppError::TransientStorage(format!(
                    "{operation} timed out after {} ms",
                    self.store_timeout.as_millis()
                ))
            })?
    }
}

fn record_from_entry(entry: LedgerEntry) -> AppResult<AuditRecord> {
    let chain_link = entry.link();
    let finding = AuditFinding::from_document(entry.finding)?;

    Ok(AuditRecord {
        finding,
        chain_link,
    })
}
