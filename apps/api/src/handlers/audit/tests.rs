use axum::Json;
use axum::extract::{Path, Query, State};
use chainaudit_core::AppError;
use chainaudit_domain::RiskAnalysis;
use serde_json::{Value, json};

use super::{
    audit_log_handler, find_audit_record_handler, merkle_root_handler, record_audit_handler,
    verify_chain_handler,
};
use crate::dto::{AuditLogQuery, VerifyChainQuery};
use crate::handlers::test_support::in_memory_state;
use crate::state::AppState;

fn analysis_value() -> Value {
    serde_json::to_value(RiskAnalysis::new(
        10,
        vec!["Internal network IP".to_owned()],
        0.9,
    ))
    .unwrap_or_default()
}

fn audit_body(event_id: &str) -> Value {
    json!({
        "eventId": event_id,
        "analysis": analysis_value(),
        "originalEvent": {
            "eventId": event_id,
            "type": "login",
            "payload": {"ipAddress": "10.0.0.8"}
        }
    })
}

async fn record(state: &AppState, event_id: &str) -> Result<String, AppError> {
    record_audit_handler(State(state.clone()), Json(audit_body(event_id)))
        .await
        .map(|Json(body)| body.merkle.hash)
        .map_err(|error| error.0)
}

#[tokio::test]
async fn recorded_entries_extend_the_chain() {
    let state = in_memory_state();

    let first = record_audit_handler(State(state.clone()), Json(audit_body("evt-a"))).await;
    let second = record_audit_handler(State(state.clone()), Json(audit_body("evt-b"))).await;

    let (Ok(Json(first)), Ok(Json(second))) = (first, second) else {
        panic!("both records should be appended");
    };
    assert!(first.success);
    assert!(first.audit_id.starts_with("audit_"));
    assert_eq!(first.merkle.seq, 1);
    assert_eq!(second.merkle.seq, 2);
    assert_eq!(second.merkle.prev_hash, Some(first.merkle.hash.clone()));
    assert_eq!(second.audit_record.chain_link, second.merkle);

    let root = merkle_root_handler(State(state)).await;
    assert_eq!(
        root.map(|Json(body)| body.merkle_root).map_err(|error| error.0),
        Ok(Some(second.merkle.hash))
    );
}

#[tokio::test]
async fn empty_ledger_has_no_root() {
    let state = in_memory_state();

    let root = merkle_root_handler(State(state)).await;

    assert_eq!(
        root.map(|Json(body)| body.merkle_root).map_err(|error| error.0),
        Ok(None)
    );
}

#[tokio::test]
async fn missing_fields_are_reported_in_order() {
    let state = in_memory_state();

    let response = record_audit_handler(
        State(state),
        Json(json!({"eventId": "", "originalEvent": "not an object"})),
    )
    .await;

    assert_eq!(
        response.map(|_| ()).map_err(|error| error.0),
        Err(AppError::InvalidFields(vec![
            "eventId".to_owned(),
            "analysis".to_owned(),
            "originalEvent".to_owned(),
        ]))
    );
}

#[tokio::test]
async fn mismatched_event_ids_are_rejected() {
    let state = in_memory_state();
    let mut body = audit_body("evt-outer");
    body["originalEvent"]["eventId"] = json!("evt-inner");

    let response = record_audit_handler(State(state), Json(body)).await;

    assert!(matches!(
        response.map_err(|error| error.0),
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn analysis_contradicting_its_score_is_rejected() {
    let state = in_memory_state();
    let mut body = audit_body("evt-forged");
    body["analysis"] = json!({
        "riskScore": 80,
        "riskLevel": "LOW",
        "riskFactors": [],
        "confidence": 7.5,
        "recommendations": []
    });

    let response = record_audit_handler(State(state.clone()), Json(body)).await;

    assert!(matches!(
        response.map_err(|error| error.0),
        Err(AppError::Validation(_))
    ));
    let root = merkle_root_handler(State(state)).await;
    assert_eq!(
        root.map(|Json(body)| body.merkle_root).map_err(|error| error.0),
        Ok(None)
    );
}

#[tokio::test]
async fn duplicate_event_is_a_conflict() {
    let state = in_memory_state();

    assert!(record(&state, "evt-dup").await.is_ok());
    let duplicate = record(&state, "evt-dup").await;

    assert_eq!(duplicate, Err(AppError::DuplicateEvent("evt-dup".to_owned())));
}

#[tokio::test]
async fn recorded_event_can_be_looked_up() {
    let state = in_memory_state();
    let hash = record(&state, "evt-lookup").await;

    let found = find_audit_record_handler(State(state.clone()), Path("evt-lookup".to_owned())).await;
    let missing = find_audit_record_handler(State(state), Path("evt-absent".to_owned())).await;

    let Ok(Json(found)) = found else {
        panic!("recorded event should be found");
    };
    assert_eq!(Ok(found.audit_record.chain_link.hash), hash);
    assert_eq!(found.audit_record.finding.event_id.as_str(), "evt-lookup");
    assert!(matches!(
        missing.map_err(|error| error.0),
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn audit_log_is_newest_first_and_limited() {
    let state = in_memory_state();
    for index in 0..4 {
        assert!(record(&state, &format!("evt-log-{index}")).await.is_ok());
    }

    let response = audit_log_handler(
        State(state),
        Query(AuditLogQuery { limit: Some(3) }),
    )
    .await;

    let Ok(Json(body)) = response else {
        panic!("audit log should load");
    };
    assert_eq!(body.count, 3);
    assert_eq!(
        body.audit_log.iter().map(|entry| entry.seq).collect::<Vec<_>>(),
        vec![4, 3, 2]
    );
}

#[tokio::test]
async fn verification_covers_the_requested_range() {
    let state = in_memory_state();
    for index in 0..5 {
        assert!(record(&state, &format!("evt-verify-{index}")).await.is_ok());
    }

    let full = verify_chain_handler(State(state.clone()), Query(VerifyChainQuery::default())).await;
    let partial = verify_chain_handler(
        State(state.clone()),
        Query(VerifyChainQuery {
            from_seq: Some(2),
            to_seq: Some(4),
        }),
    )
    .await;
    let inverted = verify_chain_handler(
        State(state),
        Query(VerifyChainQuery {
            from_seq: Some(4),
            to_seq: Some(2),
        }),
    )
    .await;

    let (Ok(Json(full)), Ok(Json(partial))) = (full, partial) else {
        panic!("verification should run");
    };
    assert!(full.valid);
    assert_eq!(full.entries_checked, 5);
    assert!(partial.valid);
    assert_eq!(partial.entries_checked, 3);
    assert_eq!(partial.first_broken_seq, None);
    assert!(matches!(
        inverted.map_err(|error| error.0),
        Err(AppError::Validation(_))
    ));
}
