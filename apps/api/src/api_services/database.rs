use std::time::Duration;

use chainaudit_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::api_config::ApiConfig;

/// Opens the Postgres pool and applies pending migrations.
pub async fn connect_and_migrate(config: &ApiConfig) -> Result<PgPool, AppError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_millis(config.database_acquire_timeout_ms))
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    info!(
        max_connections = config.database_max_connections,
        "database pool ready"
    );
    Ok(pool)
}
