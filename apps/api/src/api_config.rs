use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use chainaudit_application::{
    GENERAL_RATE_LIMIT_CATEGORY, LEDGER_RATE_LIMIT_CATEGORY, RateLimitRule, RetryPolicy,
    RiskAnalyzerConfig,
};
use chainaudit_core::AppError;
use chrono::TimeDelta;
use ipnet::IpNet;
use tracing_subscriber::EnvFilter;

/// Which pipeline stages this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    All,
    Gateway,
    Analyzer,
    Auditor,
}

impl ServiceRole {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "gateway" => Ok(Self::Gateway),
            "analyzer" => Ok(Self::Analyzer),
            "auditor" => Ok(Self::Auditor),
            other => Err(AppError::Validation(format!(
                "SERVICE_ROLE must be one of 'all', 'gateway', 'analyzer', 'auditor', got '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Gateway => "gateway",
            Self::Analyzer => "analyzer",
            Self::Auditor => "auditor",
        }
    }

    pub fn serves_gateway(self) -> bool {
        matches!(self, Self::All | Self::Gateway)
    }

    pub fn serves_analyzer(self) -> bool {
        matches!(self, Self::All | Self::Analyzer)
    }

    pub fn serves_auditor(self) -> bool {
        matches!(self, Self::All | Self::Auditor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStoreConfig {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStoreConfig {
    Memory,
    Postgres,
    Redis,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub role: ServiceRole,
    pub service_name: String,
    pub api_host: String,
    pub api_port: u16,
    pub ledger_store: LedgerStoreConfig,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_acquire_timeout_ms: u64,
    pub store_timeout_ms: u64,
    pub rate_limit_store: RateLimitStoreConfig,
    pub redis_url: Option<String>,
    pub rate_limit_window_seconds: i64,
    pub rate_limit_general_max: i32,
    pub rate_limit_ledger_max: i32,
    pub analyzer_url: String,
    pub auditor_url: String,
    pub downstream_timeout_ms: u64,
    pub stage_timeout_ms: u64,
    pub pipeline_max_retries: u32,
    pub pipeline_backoff_base_ms: u64,
    pub cors_allowed_origins: Vec<String>,
    pub risk_internal_networks: Vec<IpNet>,
    pub risk_stale_after_seconds: i64,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    pub fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let role = value("SERVICE_ROLE")
            .map(|role| ServiceRole::parse(&role))
            .transpose()?
            .unwrap_or(ServiceRole::All);
        let service_name =
            value("SERVICE_NAME").unwrap_or_else(|| format!("chainaudit-{}", role.as_str()));

        let ledger_store = match value("LEDGER_STORE").as_deref() {
            None | Some("postgres") => LedgerStoreConfig::Postgres,
            Some("memory") => LedgerStoreConfig::Memory,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "LEDGER_STORE must be either 'postgres' or 'memory', got '{other}'"
                )));
            }
        };
        let rate_limit_store = match value("RATE_LIMIT_STORE").as_deref() {
            None | Some("memory") => RateLimitStoreConfig::Memory,
            Some("postgres") => RateLimitStoreConfig::Postgres,
            Some("redis") => RateLimitStoreConfig::Redis,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "RATE_LIMIT_STORE must be one of 'memory', 'postgres', 'redis', got '{other}'"
                )));
            }
        };

        let risk_internal_networks = match value("RISK_INTERNAL_NETWORKS") {
            Some(networks) => parse_networks(&networks)?,
            None => RiskAnalyzerConfig::default_internal_networks(),
        };

        let config = Self {
            migrate_only,
            role,
            service_name,
            api_host: value("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned()),
            api_port: parse_value("API_PORT", value("API_PORT"), 3001)?,
            ledger_store,
            database_url: value("DATABASE_URL"),
            database_max_connections: parse_value(
                "DATABASE_MAX_CONNECTIONS",
                value("DATABASE_MAX_CONNECTIONS"),
                10,
            )?,
            database_acquire_timeout_ms: parse_value(
                "DATABASE_ACQUIRE_TIMEOUT_MS",
                value("DATABASE_ACQUIRE_TIMEOUT_MS"),
                3_000,
            )?,
            store_timeout_ms: parse_value("STORE_TIMEOUT_MS", value("STORE_TIMEOUT_MS"), 5_000)?,
            rate_limit_store,
            redis_url: value("REDIS_URL"),
            rate_limit_window_seconds: parse_value(
                "RATE_LIMIT_WINDOW_SECONDS",
                value("RATE_LIMIT_WINDOW_SECONDS"),
                900,
            )?,
            rate_limit_general_max: parse_value(
                "RATE_LIMIT_GENERAL_MAX",
                value("RATE_LIMIT_GENERAL_MAX"),
                100,
            )?,
            rate_limit_ledger_max: parse_value(
                "RATE_LIMIT_LEDGER_MAX",
                value("RATE_LIMIT_LEDGER_MAX"),
                30,
            )?,
            analyzer_url: value("ANALYZER_URL")
                .unwrap_or_else(|| "http://127.0.0.1:3002".to_owned()),
            auditor_url: value("AUDITOR_URL").unwrap_or_else(|| "http://127.0.0.1:3003".to_owned()),
            downstream_timeout_ms: parse_value(
                "DOWNSTREAM_TIMEOUT_MS",
                value("DOWNSTREAM_TIMEOUT_MS"),
                5_000,
            )?,
            stage_timeout_ms: parse_value("STAGE_TIMEOUT_MS", value("STAGE_TIMEOUT_MS"), 10_000)?,
            pipeline_max_retries: parse_value(
                "PIPELINE_MAX_RETRIES",
                value("PIPELINE_MAX_RETRIES"),
                3,
            )?,
            pipeline_backoff_base_ms: parse_value(
                "PIPELINE_BACKOFF_BASE_MS",
                value("PIPELINE_BACKOFF_BASE_MS"),
                100,
            )?,
            cors_allowed_origins: value("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000".to_owned())
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            risk_internal_networks,
            risk_stale_after_seconds: parse_value(
                "RISK_STALE_AFTER_SECONDS",
                value("RISK_STALE_AFTER_SECONDS"),
                86_400,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.requires_database() && self.database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required for migrations, LEDGER_STORE=postgres or RATE_LIMIT_STORE=postgres"
                    .to_owned(),
            ));
        }

        if self.rate_limit_store == RateLimitStoreConfig::Redis && self.redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned(),
            ));
        }

        if self.rate_limit_window_seconds <= 0 {
            return Err(AppError::Validation(
                "RATE_LIMIT_WINDOW_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if self.risk_stale_after_seconds <= 0 {
            return Err(AppError::Validation(
                "RISK_STALE_AFTER_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }

    /// Postgres backs the ledger only where the auditor role runs locally.
    pub fn uses_postgres_ledger(&self) -> bool {
        self.role.serves_auditor() && self.ledger_store == LedgerStoreConfig::Postgres
    }

    pub fn requires_database(&self) -> bool {
        self.migrate_only
            || self.uses_postgres_ledger()
            || self.rate_limit_store == RateLimitStoreConfig::Postgres
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    pub fn general_rate_rule(&self) -> RateLimitRule {
        RateLimitRule::new(
            GENERAL_RATE_LIMIT_CATEGORY,
            self.rate_limit_general_max,
            self.rate_limit_window_seconds,
        )
    }

    pub fn ledger_rate_rule(&self) -> RateLimitRule {
        RateLimitRule::new(
            LEDGER_RATE_LIMIT_CATEGORY,
            self.rate_limit_ledger_max,
            self.rate_limit_window_seconds,
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.pipeline_max_retries,
            Duration::from_millis(self.pipeline_backoff_base_ms),
        )
    }

    pub fn risk_analyzer_config(&self) -> RiskAnalyzerConfig {
        RiskAnalyzerConfig {
            internal_networks: self.risk_internal_networks.clone(),
            stale_after: TimeDelta::seconds(self.risk_stale_after_seconds),
            ..RiskAnalyzerConfig::default()
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_value<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value.parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_networks(value: &str) -> Result<Vec<IpNet>, AppError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|network| !network.is_empty())
        .map(|network| {
            network.parse::<IpNet>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid RISK_INTERNAL_NETWORKS entry '{network}': {error}"
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chainaudit_core::AppError;

    use super::{ApiConfig, LedgerStoreConfig, RateLimitStoreConfig, ServiceRole};

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(false, |name| values.get(name).cloned())
    }

    #[test]
    fn in_memory_defaults_need_no_database() {
        let config = load(&[("LEDGER_STORE", "memory")])
            .unwrap_or_else(|error| panic!("config should load: {error}"));

        assert_eq!(config.role, ServiceRole::All);
        assert_eq!(config.service_name, "chainaudit-all");
        assert_eq!(config.ledger_store, LedgerStoreConfig::Memory);
        assert_eq!(config.rate_limit_store, RateLimitStoreConfig::Memory);
        assert_eq!(config.api_port, 3001);
        assert_eq!(config.general_rate_rule().max_attempts, 100);
        assert_eq!(config.ledger_rate_rule().max_attempts, 30);
        assert_eq!(config.retry_policy().max_attempts(), 3);
        assert_eq!(config.cors_allowed_origins, vec!["http://localhost:3000"]);
        assert!(!config.requires_database());
    }

    #[test]
    fn postgres_ledger_requires_database_url() {
        let missing = load(&[]);
        let present = load(&[("DATABASE_URL", "postgres://localhost/chainaudit")]);

        assert!(matches!(missing, Err(AppError::Validation(_))));
        assert!(present.is_ok_and(|config| config.uses_postgres_ledger()));
    }

    #[test]
    fn gateway_role_does_not_open_the_ledger() {
        let config = load(&[("SERVICE_ROLE", "gateway")])
            .unwrap_or_else(|error| panic!("config should load: {error}"));

        assert!(config.role.serves_gateway());
        assert!(!config.role.serves_auditor());
        assert!(!config.requires_database());
        assert_eq!(config.service_name, "chainaudit-gateway");
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let error = load(&[("LEDGER_STORE", "memory"), ("API_PORT", "eighty")]).err();

        assert!(
            error.is_some_and(|error| error.to_string().contains("API_PORT")),
            "error should mention API_PORT"
        );
        assert!(load(&[("SERVICE_ROLE", "ledger")]).is_err());
        assert!(load(&[("LEDGER_STORE", "memory"), ("RATE_LIMIT_STORE", "redis")]).is_err());
    }

    #[test]
    fn internal_networks_and_origins_are_lists() {
        let config = load(&[
            ("LEDGER_STORE", "memory"),
            ("RISK_INTERNAL_NETWORKS", "10.0.0.0/8, fd00::/8"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
        ])
        .unwrap_or_else(|error| panic!("config should load: {error}"));

        assert_eq!(config.risk_internal_networks.len(), 2);
        assert_eq!(config.cors_allowed_origins.len(), 2);
        assert!(
            load(&[("LEDGER_STORE", "memory"), ("RISK_INTERNAL_NETWORKS", "10.0.0.0/33")]).is_err()
        );
    }
}
