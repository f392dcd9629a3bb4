use std::sync::Arc;

use chainaudit_application::{HeuristicRiskAnalyzer, RiskScorer};
use chainaudit_core::AppError;
use sqlx::PgPool;
use tracing::info;

use crate::api_config::ApiConfig;
use crate::state::AppState;

mod ledger;
mod pipeline;
mod rate_limits;

/// Wires the services the configured role needs.
///
/// `pool` must be set whenever the config requires a database.
pub fn build_app_state(config: &ApiConfig, pool: Option<PgPool>) -> Result<AppState, AppError> {
    let risk_scorer: Arc<dyn RiskScorer> =
        Arc::new(HeuristicRiskAnalyzer::new(config.risk_analyzer_config()));
    let audit_recorder = ledger::build_audit_recorder(config, pool.as_ref())?;
    let gateway_pipeline =
        pipeline::build_gateway_pipeline(config, risk_scorer.clone(), audit_recorder.as_ref())?;
    let rate_limit_service = rate_limits::build_rate_limit_service(config, pool.as_ref())?;

    info!(
        role = config.role.as_str(),
        ledger = audit_recorder.is_some(),
        gateway = gateway_pipeline.is_some(),
        "application state assembled"
    );

    Ok(AppState {
        service_name: config.service_name.clone(),
        risk_scorer,
        gateway_pipeline,
        audit_recorder,
        rate_limit_service,
        ledger_pool: pool.filter(|_| config.uses_postgres_ledger()),
    })
}
