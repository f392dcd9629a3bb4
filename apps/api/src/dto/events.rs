use chainaudit_core::AppError;
use chainaudit_domain::{AuditRecord, EventInput, RiskAnalysis};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Successful `POST /events` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmissionResponse {
    pub success: bool,
    pub event_id: String,
    pub analysis: RiskAnalysis,
    pub audit: AuditRecord,
    pub timestamp: DateTime<Utc>,
    pub attempts: u32,
    pub processing_time_ms: u64,
    pub replayed: bool,
}

/// `POST /events` payload after the retry budget is spent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmissionFailureResponse {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Validation failure listing every missing or invalid field.
#[derive(Debug, Serialize)]
pub struct MissingFieldsResponse {
    pub error: &'static str,
    pub required: Vec<String>,
}

/// `POST /analyze` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub event_id: String,
    pub analysis: RiskAnalysis,
    pub timestamp: DateTime<Utc>,
}

/// Reads an event body without rejecting wrongly typed fields up front.
///
/// Fields of the wrong JSON type are dropped so validation reports them
/// alongside missing ones.
pub fn event_input_from_json(body: Value) -> Result<EventInput, AppError> {
    let Value::Object(mut fields) = body else {
        return Err(AppError::Validation(
            "event body must be a JSON object".to_owned(),
        ));
    };

    let mut text = |name: &str| match fields.remove(name) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    };
    let event_id = text("eventId");
    let event_type = text("type");
    let priority = text("priority");

    Ok(EventInput {
        event_id,
        event_type,
        actor: fields.remove("actor"),
        subject: fields.remove("subject"),
        payload: fields.remove("payload"),
        priority,
        metadata: fields.remove("metadata"),
    })
}
