use super::*;

pub async fn record_audit_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<AuditResponse>> {
    let recorder = state.audit_recorder()?;
    let request: AuditRequest = serde_json::from_value(body)
        .map_err(|error| AppError::Validation(format!("invalid audit request: {error}")))?;
    let (event, analysis) = parse_audit_request(request)?;

    let audit_record = recorder.record(&event, &analysis).await?;

    Ok(Json(AuditResponse {
        success: true,
        audit_id: audit_record.finding.audit_id.clone(),
        merkle: audit_record.chain_link.clone(),
        audit_record,
    }))
}

pub async fn find_audit_record_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<AuditRecordResponse>> {
    let audit_record = state
        .audit_recorder()?
        .find_recorded(event_id.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no audit record for event '{event_id}'")))?;

    Ok(Json(AuditRecordResponse { audit_record }))
}

fn parse_audit_request(request: AuditRequest) -> Result<(Event, RiskAnalysis), AppError> {
    let event_id = request.event_id.and_then(|value| match value {
        Value::String(text) if !text.trim().is_empty() => Some(text),
        _ => None,
    });
    let analysis = request.analysis.filter(Value::is_object);
    let original_event = request.original_event.filter(Value::is_object);

    let mut missing = Vec::new();
    for (name, present) in [
        ("eventId", event_id.is_some()),
        ("analysis", analysis.is_some()),
        ("originalEvent", original_event.is_some()),
    ] {
        if !present {
            missing.push(name.to_owned());
        }
    }

    let (Some(event_id), Some(analysis), Some(original_event)) =
        (event_id, analysis, original_event)
    else {
        return Err(AppError::InvalidFields(missing));
    };

    let analysis: RiskAnalysis = serde_json::from_value(analysis)
        .map_err(|error| AppError::Validation(format!("invalid analysis: {error}")))?;

    let mut input = event_input_from_json(original_event)?;
    if let Some(original_id) = input.event_id.as_deref()
        && original_id != event_id
    {
        return Err(AppError::Validation(format!(
            "eventId '{event_id}' does not match originalEvent.eventId '{original_id}'"
        )));
    }
    input.event_id = Some(event_id);

    Ok((Event::from_input(input)?, analysis))
}
