use std::sync::Arc;
use std::time::Duration;

use chainaudit_application::{AuditRecorderService, EventTypeCompliancePolicy, LedgerRepository};
use chainaudit_core::{AppError, AppResult};
use chainaudit_infrastructure::{InMemoryLedgerRepository, PostgresLedgerRepository};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, LedgerStoreConfig};

pub(super) fn build_audit_recorder(
    config: &ApiConfig,
    pool: Option<&PgPool>,
) -> AppResult<Option<AuditRecorderService>> {
    if !config.role.serves_auditor() {
        return Ok(None);
    }

    let ledger: Arc<dyn LedgerRepository> = match config.ledger_store {
        LedgerStoreConfig::Postgres => {
            let pool = pool.ok_or_else(|| {
                AppError::Validation(
                    "DATABASE_URL is required when LEDGER_STORE=postgres".to_owned(),
                )
            })?;
            Arc::new(PostgresLedgerRepository::new(pool.clone()))
        }
        LedgerStoreConfig::Memory => Arc::new(InMemoryLedgerRepository::new()),
    };

    Ok(Some(
        AuditRecorderService::new(ledger, Arc::new(EventTypeCompliancePolicy))
            .with_store_timeout(Duration::from_millis(config.store_timeout_ms)),
    ))
}
