use axum::Json;
use axum::extract::{Path, Query, State};
use chainaudit_core::AppError;
use chainaudit_domain::{Event, RiskAnalysis};
use chrono::Utc;
use serde_json::Value;

use crate::dto::{
    AuditLogQuery, AuditLogResponse, AuditRecordResponse, AuditRequest, AuditResponse,
    MerkleRootResponse, VerifyChainQuery, VerifyChainResponse, event_input_from_json,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod log;
mod record;
mod verify;

pub use log::{audit_log_handler, merkle_root_handler};
pub use record::{find_audit_record_handler, record_audit_handler};
pub use verify::verify_chain_handler;

#[cfg(test)]
mod tests;
