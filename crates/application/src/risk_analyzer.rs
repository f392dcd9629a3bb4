//! Deterministic heuristic risk scoring.
//!
//! Scoring sums the weights of every matching [`RiskFactorRule`]. Signals
//! are read by name from the event payload, falling back to metadata;
//! missing or malformed signals never match.

use chainaudit_domain::{Event, RiskAnalysis};
use chrono::{DateTime, TimeDelta, Utc};
use ipnet::IpNet;

mod factors;

pub use factors::{
    BotUserAgentRule, InternalNetworkRule, InvalidIpAddressRule, LocationMismatchRule,
    RiskFactorRule, StaleTimestampRule,
};

/// Signal field names inspected by the built-in rules.
pub const SIGNAL_FIELDS: [&str; 5] = [
    "ipAddress",
    "userAgent",
    "location",
    "expectedLocation",
    "timestamp",
];

const BASE_CONFIDENCE: f64 = 0.9;

/// Pluggable scoring function.
///
/// Scoring is pure: the same event observed at the same instant always gets
/// the same analysis.
pub trait RiskScorer: Send + Sync {
    /// Scores an event as observed at `observed_at`.
    fn analyze(&self, event: &Event, observed_at: DateTime<Utc>) -> RiskAnalysis;
}

/// Source of observation times for scoring stages.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Signals extracted from an event for rule evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EventSignals<'a> {
    /// Source IP address.
    pub ip_address: Option<&'a str>,
    /// Client user agent.
    pub user_agent: Option<&'a str>,
    /// Reported location.
    pub location: Option<&'a str>,
    /// Location the actor usually acts from.
    pub expected_location: Option<&'a str>,
    /// Client-side event time, RFC 3339.
    pub timestamp: Option<&'a str>,
    /// Time of analysis.
    pub observed_at: DateTime<Utc>,
}

impl<'a> EventSignals<'a> {
    /// Extracts the signals of `event` as seen at `observed_at`.
    #[must_use]
    pub fn extract(event: &'a Event, observed_at: DateTime<Utc>) -> Self {
        Self {
            ip_address: event.signal("ipAddress"),
            user_agent: event.signal("userAgent"),
            location: event.signal("location"),
            expected_location: event.signal("expectedLocation"),
            timestamp: event.signal("timestamp"),
            observed_at,
        }
    }

    /// Fraction of [`SIGNAL_FIELDS`] present and non-empty.
    #[must_use]
    pub fn data_quality(&self) -> f64 {
        let present = [
            self.ip_address,
            self.user_agent,
            self.location,
            self.expected_location,
            self.timestamp,
        ]
        .iter()
        .filter(|value| value.is_some())
        .count();

        present as f64 / SIGNAL_FIELDS.len() as f64
    }
}

/// Tunables for the built-in rules.
#[derive(Debug, Clone)]
pub struct RiskAnalyzerConfig {
    /// Ranges treated as internal network addresses.
    pub internal_networks: Vec<IpNet>,
    /// Age after which an event timestamp counts as stale.
    pub stale_after: TimeDelta,
    /// Tolerated clock skew for timestamps in the future.
    pub future_skew: TimeDelta,
}

impl RiskAnalyzerConfig {
    /// Returns the RFC 1918 private ranges.
    #[must_use]
    pub fn default_internal_networks() -> Vec<IpNet> {
        ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"]
            .iter()
            .filter_map(|network| network.parse().ok())
            .collect()
    }
}

impl Default for RiskAnalyzerConfig {
    fn default() -> Self {
        Self {
            internal_networks: Self::default_internal_networks(),
            stale_after: TimeDelta::hours(24),
            future_skew: TimeDelta::minutes(5),
        }
    }
}

/// Rule-table risk analyzer.
pub struct HeuristicRiskAnalyzer {
    rules: Vec<Box<dyn RiskFactorRule>>,
}

impl HeuristicRiskAnalyzer {
    /// Creates an analyzer with the built-in rules in reporting order.
    #[must_use]
    pub fn new(config: RiskAnalyzerConfig) -> Self {
        Self {
            rules: vec![
                Box::new(InvalidIpAddressRule),
                Box::new(InternalNetworkRule::new(config.internal_networks)),
                Box::new(BotUserAgentRule),
                Box::new(LocationMismatchRule),
                Box::new(StaleTimestampRule::new(
                    config.stale_after,
                    config.future_skew,
                )),
            ],
        }
    }

    /// Appends an additional rule, evaluated after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, rule: impl RiskFactorRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Scores an event as observed at `observed_at`.
    #[must_use]
    pub fn analyze_at(&self, event: &Event, observed_at: DateTime<Utc>) -> RiskAnalysis {
        let signals = EventSignals::extract(event, observed_at);

        let mut score = 0_u32;
        let mut factors = Vec::new();
        for rule in &self.rules {
            if rule.matches(&signals) {
                score = score.saturating_add(rule.weight());
                factors.push(rule.name().to_owned());
            }
        }

        let confidence = confidence_for(signals.data_quality(), factors.len());
        RiskAnalysis::new(score, factors, confidence)
    }
}

impl Default for HeuristicRiskAnalyzer {
    fn default() -> Self {
        Self::new(RiskAnalyzerConfig::default())
    }
}

impl RiskScorer for HeuristicRiskAnalyzer {
    fn analyze(&self, event: &Event, observed_at: DateTime<Utc>) -> RiskAnalysis {
        self.analyze_at(event, observed_at)
    }
}

/// Confidence before clamping: penalized for sparse signals and for many
/// simultaneous factors.
#[must_use]
pub fn confidence_for(data_quality: f64, factor_count: usize) -> f64 {
    let mut confidence = BASE_CONFIDENCE;

    if data_quality < 0.8 {
        confidence -= 0.2;
    }
    if data_quality < 0.6 {
        confidence -= 0.3;
    }
    if factor_count > 3 {
        confidence -= 0.1;
    }
    if factor_count > 5 {
        confidence -= 0.2;
    }

    confidence
}
