mod events;
mod health;
mod ledger;

pub use events::{
    AnalyzeResponse, EventSubmissionFailureResponse, EventSubmissionResponse,
    MissingFieldsResponse, event_input_from_json,
};
pub use health::{HealthDependencyStatus, HealthResponse};
pub use ledger::{
    AuditLogQuery, AuditLogResponse, AuditRecordResponse, AuditRequest, AuditResponse,
    MerkleRootResponse, VerifyChainQuery, VerifyChainResponse,
};
