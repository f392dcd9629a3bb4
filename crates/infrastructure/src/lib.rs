//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_pipeline_stages;
mod in_memory_ledger_repository;
mod in_memory_rate_limit_repository;
mod postgres_errors;
mod postgres_ledger_repository;
mod postgres_rate_limit_repository;
mod redis_rate_limit_repository;

pub use http_pipeline_stages::{CHAIN_INTEGRITY_ERROR, HttpAnalysisStage, HttpRecordStage};
pub use in_memory_ledger_repository::InMemoryLedgerRepository;
pub use in_memory_rate_limit_repository::InMemoryRateLimitRepository;
pub use postgres_ledger_repository::PostgresLedgerRepository;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use redis_rate_limit_repository::RedisRateLimitRepository;
