use std::sync::Arc;

use async_trait::async_trait;
use chainaudit_core::AppResult;
use chainaudit_domain::{AuditRecord, Event, EventId, RiskAnalysis};

use crate::audit_recorder_service::AuditRecorderService;
use crate::risk_analyzer::{Clock, RiskScorer, SystemClock};

/// Risk analysis stage of the gateway pipeline.
#[async_trait]
pub trait AnalysisStage: Send + Sync {
    /// Scores an event.
    async fn analyze(&self, event: &Event) -> AppResult<RiskAnalysis>;
}

/// Audit recording stage of the gateway pipeline.
#[async_trait]
pub trait RecordStage: Send + Sync {
    /// Records an analyzed event in the ledger.
    async fn record(&self, event: &Event, analysis: &RiskAnalysis) -> AppResult<AuditRecord>;

    /// Loads the record already stored for an event.
    async fn find_recorded(&self, event_id: &EventId) -> AppResult<Option<AuditRecord>>;
}

/// Runs a [`RiskScorer`] in-process, observing events at the time its
/// [`Clock`] reports.
#[derive(Clone)]
pub struct LocalAnalysisStage {
    scorer: Arc<dyn RiskScorer>,
    clock: Arc<dyn Clock>,
}

impl LocalAnalysisStage {
    /// Wraps a scorer as a pipeline stage on the system clock.
    #[must_use]
    pub fn new(scorer: Arc<dyn RiskScorer>) -> Self {
        Self {
            scorer,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for observation times.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl AnalysisStage for LocalAnalysisStage {
    async fn analyze(&self, event: &Event) -> AppResult<RiskAnalysis> {
        Ok(self.scorer.analyze(event, self.clock.now()))
    }
}

#[async_trait]
impl RecordStage for AuditRecorderService {
    async fn record(&self, event: &Event, analysis: &RiskAnalysis) -> AppResult<AuditRecord> {
        AuditRecorderService::record(self, event, analysis).await
    }

    async fn find_recorded(&self, event_id: &EventId) -> AppResult<Option<AuditRecord>> {
        AuditRecorderService::find_recorded(self, event_id.as_str()).await
    }
}
