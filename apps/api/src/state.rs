use std::sync::Arc;

use chainaudit_application::{AuditRecorderService, GatewayPipeline, RateLimitService, RiskScorer};
use chainaudit_core::AppError;
use sqlx::PgPool;

/// Shared application state.
///
/// Components a role does not serve are left unset and their routes are
/// not mounted.
#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub risk_scorer: Arc<dyn RiskScorer>,
    pub gateway_pipeline: Option<GatewayPipeline>,
    pub audit_recorder: Option<AuditRecorderService>,
    pub rate_limit_service: RateLimitService,
    pub ledger_pool: Option<PgPool>,
}

impl AppState {
    pub fn gateway_pipeline(&self) -> Result<&GatewayPipeline, AppError> {
        self.gateway_pipeline
            .as_ref()
            .ok_or_else(|| AppError::Internal("gateway pipeline is not configured".to_owned()))
    }

    pub fn audit_recorder(&self) -> Result<&AuditRecorderService, AppError> {
        self.audit_recorder
            .as_ref()
            .ok_or_else(|| AppError::Internal("audit recorder is not configured".to_owned()))
    }
}
