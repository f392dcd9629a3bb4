use axum::Json;
use axum::extract::State;
use chainaudit_domain::Event;
use chrono::Utc;
use serde_json::Value;

use crate::dto::{AnalyzeResponse, event_input_from_json};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn analyze_event_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let event = Event::from_input(event_input_from_json(body)?)?;
    let observed_at = Utc::now();
    let analysis = state.risk_scorer.analyze(&event, observed_at);

    Ok(Json(AnalyzeResponse {
        success: true,
        event_id: event.event_id().to_string(),
        analysis,
        timestamp: observed_at,
    }))
}
