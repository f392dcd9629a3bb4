//! Fixed-window request budgets keyed by caller.

mod config;
mod ports;
mod service;

pub use config::{
    DEFAULT_RATE_LIMIT_WINDOW_SECONDS, GENERAL_RATE_LIMIT_CATEGORY, LEDGER_RATE_LIMIT_CATEGORY,
    RateLimitRule,
};
pub use ports::{AttemptInfo, RateLimitRepository};
pub use service::RateLimitService;
