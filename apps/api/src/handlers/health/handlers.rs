use super::checks::check_ledger;
use super::*;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ledger = check_ledger(&state).await;

    let ready = is_healthy(ledger.status);
    let status = if ready { "ok" } else { "degraded" };
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            service: state.service_name.clone(),
            timestamp: Utc::now(),
            ledger,
        }),
    )
}

fn is_healthy(status: &str) -> bool {
    matches!(status, "ok" | "disabled")
}
