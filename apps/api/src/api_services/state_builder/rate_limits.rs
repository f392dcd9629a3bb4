use std::sync::Arc;

use chainaudit_application::{RateLimitRepository, RateLimitService};
use chainaudit_core::{AppError, AppResult};
use chainaudit_infrastructure::{
    InMemoryRateLimitRepository, PostgresRateLimitRepository, RedisRateLimitRepository,
};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, RateLimitStoreConfig};

const REDIS_KEY_PREFIX: &str = "chainaudit:rate_limit";

pub(super) fn build_rate_limit_service(
    config: &ApiConfig,
    pool: Option<&PgPool>,
) -> AppResult<RateLimitService> {
    let rate_limit_repository: Arc<dyn RateLimitRepository> = match config.rate_limit_store {
        RateLimitStoreConfig::Memory => Arc::new(InMemoryRateLimitRepository::new()),
        RateLimitStoreConfig::Postgres => {
            let pool = pool.ok_or_else(|| {
                AppError::Validation(
                    "DATABASE_URL is required when RATE_LIMIT_STORE=postgres".to_owned(),
                )
            })?;
            Arc::new(PostgresRateLimitRepository::new(pool.clone()))
        }
        RateLimitStoreConfig::Redis => {
            let redis_url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::Validation("REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned())
            })?;
            let client = redis::Client::open(redis_url)
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
            Arc::new(RedisRateLimitRepository::new(client, REDIS_KEY_PREFIX))
        }
    };

    Ok(RateLimitService::new(rate_limit_repository))
}
