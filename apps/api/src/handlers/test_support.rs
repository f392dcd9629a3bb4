use crate::api_config::ApiConfig;
use crate::api_services::build_app_state;
use crate::state::AppState;

/// Combined-role state over in-memory stores.
pub(crate) fn in_memory_state() -> AppState {
    let state = ApiConfig::from_lookup(false, |name| match name {
        "LEDGER_STORE" => Some("memory".to_owned()),
        "PIPELINE_BACKOFF_BASE_MS" => Some("1".to_owned()),
        _ => None,
    })
    .and_then(|config| build_app_state(&config, None));

    match state {
        Ok(state) => state,
        Err(error) => panic!("in-memory state should build: {error}"),
    }
}

#[test]
fn combined_role_wires_every_component() {
    let state = in_memory_state();

    assert!(state.gateway_pipeline().is_ok());
    assert!(state.audit_recorder().is_ok());
    assert!(state.ledger_pool.is_none());
}
