use axum::Json;
use axum::extract::State;
use chainaudit_application::PipelineFailure;
use chrono::Utc;
use serde_json::Value;

use crate::dto::{EventSubmissionResponse, event_input_from_json};
use crate::error::EventSubmissionError;
use crate::state::AppState;

pub async fn submit_event_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<EventSubmissionResponse>, EventSubmissionError> {
    let pipeline = state
        .gateway_pipeline()
        .map_err(|error| EventSubmissionError(rejected(error)))?;
    let input =
        event_input_from_json(body).map_err(|error| EventSubmissionError(rejected(error)))?;

    let result = pipeline.submit(input).await.map_err(EventSubmissionError)?;

    Ok(Json(EventSubmissionResponse {
        success: true,
        event_id: result.event_id.to_string(),
        analysis: result.analysis,
        audit: result.audit_record,
        timestamp: Utc::now(),
        attempts: result.attempts,
        processing_time_ms: result.processing_time_ms,
        replayed: result.replayed,
    }))
}

fn rejected(error: chainaudit_core::AppError) -> PipelineFailure {
    PipelineFailure {
        error,
        attempts: 0,
        last_error: None,
    }
}
