use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub ledger: HealthDependencyStatus,
}

/// One runtime dependency health status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}
