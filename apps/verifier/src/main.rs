//! chainaudit ledger verifier.
//!
//! Walks the Postgres hash chain on a fixed interval. A broken link is
//! recorded as a halt in the ledger, which stops appends from every API
//! process sharing the database. With `--once` it verifies a single time and
//! exits with an error when the chain is broken. With `--resume` it
//! re-verifies the repaired chain and clears the halt.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chainaudit_application::{AuditRecorderService, EventTypeCompliancePolicy};
use chainaudit_core::{AppError, AppResult};
use chainaudit_infrastructure::PostgresLedgerRepository;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
struct VerifierConfig {
    database_url: String,
    interval_seconds: u64,
    page_size: usize,
    once: bool,
    resume: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let arguments: Vec<String> = env::args().skip(1).collect();
    let flag = |name: &str| arguments.iter().any(|argument| argument == name);
    let config =
        VerifierConfig::from_lookup(flag("--once"), flag("--resume"), |name| env::var(name).ok())?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let recorder = build_recorder(pool, config.page_size);

    info!(
        interval_seconds = config.interval_seconds,
        page_size = config.page_size,
        once = config.once,
        resume = config.resume,
        "chainaudit-verifier started"
    );

    if config.resume {
        let cleared = recorder.resume_appends().await?;
        info!(cleared, "ledger appends resumed");
        return Ok(());
    }

    if config.once {
        return verify_once(&recorder).await;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_seconds));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(error) = verify_once(&recorder).await {
            warn!(error = %error, "ledger verification round failed");
        }
    }
}

async fn verify_once(recorder: &AuditRecorderService) -> AppResult<()> {
    let verification = recorder.verify_chain(None, None).await?;

    if verification.valid {
        info!(
            entries_checked = verification.entries_checked,
            "ledger chain verified"
        );
        return Ok(());
    }

    error!(
        entries_checked = verification.entries_checked,
        first_broken_seq = verification.first_broken_seq,
        "ledger chain is broken"
    );
    Err(AppError::ChainIntegrity(format!(
        "entry {} failed verification: {}",
        verification.first_broken_seq.unwrap_or_default(),
        verification.reason.as_deref().unwrap_or("unknown")
    )))
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_recorder(pool: PgPool, page_size: usize) -> AuditRecorderService {
    AuditRecorderService::new(
        Arc::new(PostgresLedgerRepository::new(pool)),
        Arc::new(EventTypeCompliancePolicy),
    )
    .with_verify_page_size(page_size)
}

impl VerifierConfig {
    fn from_lookup(
        once: bool,
        resume: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let database_url = value("DATABASE_URL")
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;
        let interval_seconds = parse_value(
            "VERIFIER_INTERVAL_SECONDS",
            value("VERIFIER_INTERVAL_SECONDS"),
            300_u64,
        )?;
        let page_size = parse_value("VERIFIER_PAGE_SIZE", value("VERIFIER_PAGE_SIZE"), 500_usize)?;

        if interval_seconds == 0 {
            return Err(AppError::Validation(
                "VERIFIER_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if page_size == 0 {
            return Err(AppError::Validation(
                "VERIFIER_PAGE_SIZE must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            interval_seconds,
            page_size,
            once,
            resume,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_value<T>(name: &str, value: Option<String>, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value.parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chainaudit_core::AppError;

    use super::VerifierConfig;

    fn load(once: bool, pairs: &[(&str, &str)]) -> Result<VerifierConfig, AppError> {
        load_with_resume(once, false, pairs)
    }

    fn load_with_resume(
        once: bool,
        resume: bool,
        pairs: &[(&str, &str)],
    ) -> Result<VerifierConfig, AppError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        VerifierConfig::from_lookup(once, resume, |name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = load(true, &[("DATABASE_URL", "postgres://localhost/chainaudit")]);

        assert_eq!(
            config,
            Ok(VerifierConfig {
                database_url: "postgres://localhost/chainaudit".to_owned(),
                interval_seconds: 300,
                page_size: 500,
                once: true,
                resume: false,
            })
        );
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(
            load(false, &[("VERIFIER_PAGE_SIZE", "100")]),
            Err(AppError::Validation("DATABASE_URL is required".to_owned()))
        );
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = load(
            false,
            &[
                ("DATABASE_URL", "postgres://localhost/chainaudit"),
                ("VERIFIER_PAGE_SIZE", "0"),
            ],
        );

        assert!(matches!(config, Err(AppError::Validation(_))));
    }

    #[test]
    fn resume_flag_is_carried_into_the_config() {
        let config = load_with_resume(
            false,
            true,
            &[("DATABASE_URL", "postgres://localhost/chainaudit")],
        );

        assert!(config.is_ok_and(|config| config.resume && !config.once));
    }
}
