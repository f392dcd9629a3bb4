use super::*;

pub async fn verify_chain_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyChainQuery>,
) -> ApiResult<Json<VerifyChainResponse>> {
    let verification = state
        .audit_recorder()?
        .verify_chain(query.from_seq, query.to_seq)
        .await?;

    Ok(Json(VerifyChainResponse {
        valid: verification.valid,
        entries_checked: verification.entries_checked,
        first_broken_seq: verification.first_broken_seq,
        reason: verification.reason,
        timestamp: Utc::now(),
    }))
}
