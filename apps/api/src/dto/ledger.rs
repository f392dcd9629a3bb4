use chainaudit_domain::{AuditRecord, ChainLink, LedgerEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming `POST /audit` body. Fields are validated by the handler.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequest {
    #[serde(default)]
    pub event_id: Option<Value>,
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub original_event: Option<Value>,
}

/// `POST /audit` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub success: bool,
    pub audit_id: String,
    pub audit_record: AuditRecord,
    pub merkle: ChainLink,
}

/// `GET /audit/events/{eventId}` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecordResponse {
    pub audit_record: AuditRecord,
}

/// `GET /merkle/root` payload. `merkle_root` is null on an empty ledger.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleRootResponse {
    pub merkle_root: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<usize>,
}

/// `GET /audit/log` payload, newest entries first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub audit_log: Vec<LedgerEntry>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyChainQuery {
    pub from_seq: Option<i64>,
    pub to_seq: Option<i64>,
}

/// `GET /audit/verify` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyChainResponse {
    pub valid: bool,
    pub entries_checked: u64,
    pub first_broken_seq: Option<i64>,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}
