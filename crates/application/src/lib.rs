//! Application services and ports for the audit pipeline.

#![forbid(unsafe_code)]

mod audit_recorder_service;
mod compliance_policy;
mod gateway_pipeline;
mod gateway_ports;
mod ledger_ports;
mod rate_limit_service;
mod retry_policy;
mod risk_analyzer;

#[cfg(test)]
mod test_support;

pub use audit_recorder_service::{
    AuditRecorderService, DEFAULT_AUDIT_LOG_LIMIT, DEFAULT_STORE_TIMEOUT,
    DEFAULT_VERIFY_PAGE_SIZE, MAX_AUDIT_LOG_LIMIT, generate_audit_id,
};
pub use compliance_policy::{CompliancePolicy, EventTypeCompliancePolicy};
pub use gateway_pipeline::{
    DEFAULT_STAGE_TIMEOUT, GatewayPipeline, PipelineFailure, PipelineResult, PipelineStage,
};
pub use gateway_ports::{AnalysisStage, LocalAnalysisStage, RecordStage};
pub use ledger_ports::{LedgerRepository, appends_halted_error};
pub use rate_limit_service::{
    AttemptInfo, DEFAULT_RATE_LIMIT_WINDOW_SECONDS, GENERAL_RATE_LIMIT_CATEGORY,
    LEDGER_RATE_LIMIT_CATEGORY, RateLimitRepository, RateLimitRule, RateLimitService,
};
pub use retry_policy::{
    DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, RetryPolicy,
};
pub use risk_analyzer::{
    BotUserAgentRule, Clock, EventSignals, HeuristicRiskAnalyzer, InternalNetworkRule,
    InvalidIpAddressRule, LocationMismatchRule, RiskAnalyzerConfig, RiskFactorRule, RiskScorer,
    SIGNAL_FIELDS, StaleTimestampRule, SystemClock, confidence_for,
};
