use super::*;

pub async fn audit_log_handler(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Json<AuditLogResponse>> {
    let audit_log = state.audit_recorder()?.recent_log(query.limit).await?;

    Ok(Json(AuditLogResponse {
        count: audit_log.len(),
        audit_log,
        timestamp: Utc::now(),
    }))
}

pub async fn merkle_root_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<MerkleRootResponse>> {
    let merkle_root = state.audit_recorder()?.chain_root().await?;

    Ok(Json(MerkleRootResponse {
        merkle_root,
        timestamp: Utc::now(),
    }))
}
