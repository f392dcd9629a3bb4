//! chainaudit API composition root.
//!
//! One binary serves the gateway, analyzer and auditor roles, separately or
//! combined, as selected by `SERVICE_ROLE`.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::time::Duration;

use chainaudit_application::RateLimitService;
use chainaudit_core::AppError;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};
use crate::api_services::{build_app_state, connect_and_migrate};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = if config.requires_database() {
        Some(connect_and_migrate(&config).await?)
    } else {
        None
    };

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let app_state = build_app_state(&config, pool)?;
    spawn_rate_limit_cleanup(app_state.rate_limit_service.clone());

    let app = api_router::build_router(app_state, &config)?;
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        role = config.role.as_str(),
        service = %config.service_name,
        "chainaudit-api listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn spawn_rate_limit_cleanup(rate_limit_service: RateLimitService) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match rate_limit_service.cleanup().await {
                Ok(removed) if removed > 0 => info!(removed, "expired rate limit windows removed"),
                Ok(_) => {}
                Err(error) => warn!(error = %error, "rate limit cleanup failed"),
            }
        }
    });
}
