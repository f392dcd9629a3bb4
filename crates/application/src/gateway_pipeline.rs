//! Gateway orchestration: validate, route, analyze and record an event.
//!
//! The three stages run in order for every attempt. A retryable failure in
//! any stage restarts the whole sequence after the retry policy's backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chainaudit_core::{AppError, AppResult};
use chainaudit_domain::{AuditRecord, Event, EventId, EventInput, RiskAnalysis};
use tracing::{debug, info, warn};

use crate::gateway_ports::{AnalysisStage, RecordStage};
use crate::retry_policy::RetryPolicy;

/// Default bound for a single stage call.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Stage of the gateway pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Local routing decision.
    Route,
    /// Risk analysis.
    Analyze,
    /// Ledger recording.
    Record,
}

impl PipelineStage {
    /// Returns the stage name used in logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Analyze => "analyze",
            Self::Record => "record",
        }
    }
}

/// Successful pipeline outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    /// Identifier of the processed event.
    pub event_id: EventId,
    /// Risk analysis embedded in the record.
    pub analysis: RiskAnalysis,
    /// Recorded audit entry.
    pub audit_record: AuditRecord,
    /// Number of attempts used, including the successful one.
    pub attempts: u32,
    /// Wall-clock time spent in the pipeline.
    pub processing_time_ms: u64,
    /// Whether the record already existed from an earlier submission.
    pub replayed: bool,
}

/// Failed pipeline outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFailure {
    /// Error that ended processing.
    pub error: AppError,
    /// Number of attempts made. Zero when validation failed.
    pub attempts: u32,
    /// Description of the last stage failure.
    pub last_error: Option<String>,
}

struct StageFailure {
    stage: PipelineStage,
    error: AppError,
}

impl StageFailure {
    fn describe(&self) -> String {
        format!("{} stage failed: {}", self.stage.as_str(), self.error)
    }
}

struct StageOutcome {
    analysis: RiskAnalysis,
    audit_record: AuditRecord,
    replayed: bool,
}

/// Orchestrates the analyzer and recorder stages for inbound events.
#[derive(Clone)]
pub struct GatewayPipeline {
    analysis_stage: Arc<dyn AnalysisStage>,
    record_stage: Arc<dyn RecordStage>,
    retry_policy: RetryPolicy,
    stage_timeout: Duration,
}

impl GatewayPipeline {
    /// Creates a pipeline over the given stages.
    #[must_use]
    pub fn new(
        analysis_stage: Arc<dyn AnalysisStage>,
        record_stage: Arc<dyn RecordStage>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            analysis_stage,
            record_stage,
            retry_policy,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// Overrides the per-stage timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    /// Validates and processes an inbound event.
    ///
    /// Validation failures are returned without calling any stage.
    pub async fn submit(&self, input: EventInput) -> Result<PipelineResult, PipelineFailure> {
        let started = Instant::now();
        let event = Event::from_input(input).map_err(|error| PipelineFailure {
            error,
            attempts: 0,
            last_error: None,
        })?;

        self.process(event, started).await
    }

    async fn process(
        &self,
        event: Event,
        started: Instant,
    ) -> Result<PipelineResult, PipelineFailure> {
        let mut attempt = 0_u32;

        loop {
            attempt = attempt.saturating_add(1);

            let failure = match self.run_stages(&event).await {
                Ok(outcome) => {
                    let processing_time_ms =
                        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    info!(
                        event_id = %event.event_id(),
                        attempts = attempt,
                        seq = outcome.audit_record.chain_link.seq,
                        replayed = outcome.replayed,
                        processing_time_ms,
                        "event processed"
                    );

                    return Ok(PipelineResult {
                        event_id: event.event_id().clone(),
                        analysis: outcome.analysis,
                        audit_record: outcome.audit_record,
                        attempts: attempt,
                        processing_time_ms,
                        replayed: outcome.replayed,
                    });
                }
                Err(failure) => failure,
            };

            let last_error = failure.describe();
            if !failure.error.is_retryable() || !self.retry_policy.allows_retry_after(attempt) {
                warn!(
                    event_id = %event.event_id(),
                    attempts = attempt,
                    stage = failure.stage.as_str(),
                    error = %failure.error,
                    "event processing failed"
                );

                return Err(PipelineFailure {
                    error: failure.error,
                    attempts: attempt,
                    last_error: Some(last_error),
                });
            }

            let delay = self.retry_policy.delay_after(attempt);
            warn!(
                event_id = %event.event_id(),
                attempt,
                stage = failure.stage.as_str(),
                error = %failure.error,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "pipeline attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn run_stages(&self, event: &Event) -> Result<StageOutcome, StageFailure> {
        route(event);

        let analysis = self
            .bounded(PipelineStage::Analyze, self.analysis_stage.analyze(event))
            .await?;

        match self
            .bounded(
                PipelineStage::Record,
                self.record_stage.record(event, &analysis),
            )
            .await
        {
            Ok(audit_record) => Ok(StageOutcome {
                analysis,
                audit_record,
                replayed: false,
            }),
            Err(StageFailure {
                error: AppError::DuplicateEvent(_),
                ..
            }) => self.confirm_replay(event).await,
            Err(failure) => Err(failure),
        }
    }

    async fn confirm_replay(&self, event: &Event) -> Result<StageOutcome, StageFailure> {
        let existing = self
            .bounded(
                PipelineStage::Record,
                self.record_stage.find_recorded(event.event_id()),
            )
            .await?;

        let Some(audit_record) = existing else {
            return Err(StageFailure {
                stage: PipelineStage::Record,
                error: AppError::TransientStorage(format!(
                    "event '{}' reported as duplicate but is not readable yet",
                    event.event_id()
                )),
            });
        };

        if audit_record.finding.original_event != *event {
            return Err(StageFailure {
                stage: PipelineStage::Record,
                error: AppError::Conflict(format!(
                    "event '{}' was already recorded with different content",
                    event.event_id()
                )),
            });
        }

        info!(
            event_id = %event.event_id(),
            seq = audit_record.chain_link.seq,
            "duplicate submission resolved to existing record"
        );

        Ok(StageOutcome {
            analysis: audit_record.finding.analysis.clone(),
            audit_record,
            replayed: true,
        })
    }

    async fn bounded<T>(
        &self,
        stage: PipelineStage,
        future: impl Future<Output = AppResult<T>>,
    ) -> Result<T, StageFailure> {
        match tokio::time::timeout(self.stage_timeout, future).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(StageFailure { stage, error }),
            Err(_) => Err(StageFailure {
                stage,
                error: AppError::DownstreamUnavailable(format!(
                    "{} stage timed out after {} ms",
                    stage.as_str(),
                    self.stage_timeout.as_millis()
                )),
            }),
        }
    }
}

fn route(event: &Event) {
    debug!(
        event_id = %event.event_id(),
        event_type = event.event_type(),
        priority = event.priority(),
        "routing event to analysis"
    );
}
