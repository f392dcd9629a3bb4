use std::sync::Arc;
use std::time::Duration;

use chainaudit_application::{
    AnalysisStage, AuditRecorderService, GatewayPipeline, LocalAnalysisStage, RecordStage,
    RiskScorer,
};
use chainaudit_core::{AppError, AppResult};
use chainaudit_infrastructure::{HttpAnalysisStage, HttpRecordStage};

use crate::api_config::{ApiConfig, ServiceRole};

/// Builds the pipeline for roles that accept `POST /events`.
///
/// The combined role runs both stages in-process. A standalone gateway
/// reaches the analyzer and auditor over HTTP.
pub(super) fn build_gateway_pipeline(
    config: &ApiConfig,
    risk_scorer: Arc<dyn RiskScorer>,
    audit_recorder: Option<&AuditRecorderService>,
) -> AppResult<Option<GatewayPipeline>> {
    if !config.role.serves_gateway() {
        return Ok(None);
    }

    let (analysis_stage, record_stage): (Arc<dyn AnalysisStage>, Arc<dyn RecordStage>) =
        match (config.role, audit_recorder) {
            (ServiceRole::All, Some(audit_recorder)) => (
                Arc::new(LocalAnalysisStage::new(risk_scorer)),
                Arc::new(audit_recorder.clone()),
            ),
            _ => {
                let http_client = reqwest::Client::builder()
                    .timeout(Duration::from_millis(config.downstream_timeout_ms))
                    .build()
                    .map_err(|error| {
                        AppError::Internal(format!("failed to build downstream client: {error}"))
                    })?;
                (
                    Arc::new(HttpAnalysisStage::new(
                        http_client.clone(),
                        config.analyzer_url.as_str(),
                    )),
                    Arc::new(HttpRecordStage::new(
                        http_client,
                        config.auditor_url.as_str(),
                    )),
                )
            }
        };

    Ok(Some(
        GatewayPipeline::new(analysis_stage, record_stage, config.retry_policy())
            .with_stage_timeout(Duration::from_millis(config.stage_timeout_ms)),
    ))
}
