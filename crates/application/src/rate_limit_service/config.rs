/// Category for event submission and analysis endpoints.
pub const GENERAL_RATE_LIMIT_CATEGORY: &str = "general";
/// Category for ledger reads and audit writes.
pub const LEDGER_RATE_LIMIT_CATEGORY: &str = "ledger";
/// Fifteen minutes.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: i64 = 15 * 60;

/// Budget for one category of requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Category name, used as the key prefix.
    pub category: String,
    /// Maximum number of requests allowed in the window.
    pub max_attempts: i32,
    /// Window duration in seconds.
    pub window_seconds: i64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: i32, window_seconds: i64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }

    /// 100 requests per 15 minutes for submission endpoints.
    #[must_use]
    pub fn general() -> Self {
        Self::new(
            GENERAL_RATE_LIMIT_CATEGORY,
            100,
            DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
        )
    }

    /// 30 requests per 15 minutes for ledger endpoints.
    #[must_use]
    pub fn ledger() -> Self {
        Self::new(
            LEDGER_RATE_LIMIT_CATEGORY,
            30,
            DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
        )
    }
}
