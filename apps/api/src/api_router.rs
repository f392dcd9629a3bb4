use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use chainaudit_core::AppError;
use tower_http::trace::TraceLayer;

use crate::api_config::ApiConfig;
use crate::middleware::RateLimitRules;
use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

/// Builds the router for the configured role.
///
/// Only the routes of the roles this process serves are mounted; `/health`
/// is always available.
pub fn build_router(app_state: AppState, config: &ApiConfig) -> Result<Router, AppError> {
    let mut app = Router::new().route("/health", get(handlers::health::health_handler));

    if config.role.serves_gateway() {
        app = app.merge(build_gateway_routes(
            app_state.clone(),
            gateway_rate_rules(config),
        ));
    }
    if config.role.serves_analyzer() {
        app = app.merge(build_analyzer_routes(
            app_state.clone(),
            RateLimitRules(vec![config.general_rate_rule()]),
        ));
    }
    if config.role.serves_auditor() {
        app = app.merge(build_auditor_routes(
            app_state.clone(),
            RateLimitRules(vec![config.ledger_rate_rule()]),
        ));
    }

    Ok(app
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(&config.cors_allowed_origins)?)
        .with_state(app_state))
}

/// `/events` appends to the ledger in-process when this role also serves
/// the auditor, so the ledger budget applies on top of the general one.
fn gateway_rate_rules(config: &ApiConfig) -> RateLimitRules {
    let mut rules = vec![config.general_rate_rule()];
    if config.role.serves_auditor() {
        rules.push(config.ledger_rate_rule());
    }

    RateLimitRules(rules)
}

fn build_gateway_routes(app_state: AppState, rules: RateLimitRules) -> Router<AppState> {
    Router::new()
        .route("/events", post(handlers::events::submit_event_handler))
        .route_layer(from_fn_with_state(app_state, middleware::rate_limit))
        .layer(axum::Extension(rules))
}

fn build_analyzer_routes(app_state: AppState, rules: RateLimitRules) -> Router<AppState> {
    Router::new()
        .route("/analyze", post(handlers::analyze::analyze_event_handler))
        .route_layer(from_fn_with_state(app_state, middleware::rate_limit))
        .layer(axum::Extension(rules))
}

fn build_auditor_routes(app_state: AppState, rules: RateLimitRules) -> Router<AppState> {
    Router::new()
        .route("/audit", post(handlers::audit::record_audit_handler))
        .route("/audit/log", get(handlers::audit::audit_log_handler))
        .route("/audit/verify", get(handlers::audit::verify_chain_handler))
        .route(
            "/audit/events/{event_id}",
            get(handlers::audit::find_audit_record_handler),
        )
        .route("/merkle/root", get(handlers::audit::merkle_root_handler))
        .route_layer(from_fn_with_state(app_state, middleware::rate_limit))
        .layer(axum::Extension(rules))
}
