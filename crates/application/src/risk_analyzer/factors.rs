use std::net::IpAddr;

use chrono::{DateTime, TimeDelta, Utc};
use ipnet::IpNet;

use super::EventSignals;

/// A named heuristic condition with a fixed weight.
pub trait RiskFactorRule: Send + Sync {
    /// Human-readable factor name reported in the analysis.
    fn name(&self) -> &str;

    /// Score contribution when the rule matches.
    fn weight(&self) -> u32;

    /// Returns whether the rule matches the extracted signals.
    fn matches(&self, signals: &EventSignals<'_>) -> bool;
}

/// Unroutable `0.0.0.0` source address.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidIpAddressRule;

impl RiskFactorRule for InvalidIpAddressRule {
    fn name(&self) -> &str {
        "Invalid IP address"
    }

    fn weight(&self) -> u32 {
        50
    }

    fn matches(&self, signals: &EventSignals<'_>) -> bool {
        signals.ip_address == Some("0.0.0.0")
    }
}

/// Source address inside one of the configured internal ranges.
#[derive(Debug, Clone)]
pub struct InternalNetworkRule {
    networks: Vec<IpNet>,
}

impl InternalNetworkRule {
    /// Creates the rule for the given ranges.
    #[must_use]
    pub fn new(networks: Vec<IpNet>) -> Self {
        Self { networks }
    }
}

impl RiskFactorRule for InternalNetworkRule {
    fn name(&self) -> &str {
        "Internal network IP"
    }

    fn weight(&self) -> u32 {
        10
    }

    fn matches(&self, signals: &EventSignals<'_>) -> bool {
        let Some(address) = signals
            .ip_address
            .and_then(|value| value.parse::<IpAddr>().ok())
        else {
            return false;
        };

        self.networks
            .iter()
            .any(|network| network.contains(&address))
    }
}

/// User agent that identifies itself as a bot.
#[derive(Debug, Clone, Copy, Default)]
pub struct BotUserAgentRule;

impl RiskFactorRule for BotUserAgentRule {
    fn name(&self) -> &str {
        "Bot-like user agent"
    }

    fn weight(&self) -> u32 {
        30
    }

    fn matches(&self, signals: &EventSignals<'_>) -> bool {
        signals
            .user_agent
            .is_some_and(|value| value.to_ascii_lowercase().contains("bot"))
    }
}

/// Reported location differs from the expected one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationMismatchRule;

impl RiskFactorRule for LocationMismatchRule {
    fn name(&self) -> &str {
        "Geographic location mismatch"
    }

    fn weight(&self) -> u32 {
        20
    }

    fn matches(&self, signals: &EventSignals<'_>) -> bool {
        match (signals.location, signals.expected_location) {
            (Some(location), Some(expected)) => !location.eq_ignore_ascii_case(expected),
            _ => false,
        }
    }
}

/// Event timestamp too far in the past, or in the future beyond the
/// tolerated clock skew.
#[derive(Debug, Clone, Copy)]
pub struct StaleTimestampRule {
    stale_after: TimeDelta,
    future_skew: TimeDelta,
}

impl StaleTimestampRule {
    /// Creates the rule with the given windows.
    #[must_use]
    pub fn new(stale_after: TimeDelta, future_skew: TimeDelta) -> Self {
        Self {
            stale_after,
            future_skew,
        }
    }
}

impl RiskFactorRule for StaleTimestampRule {
    fn name(&self) -> &str {
        "Stale event timestamp"
    }

    fn weight(&self) -> u32 {
        20
    }

    fn matches(&self, signals: &EventSignals<'_>) -> bool {
        let Some(occurred_at) = signals
            .timestamp
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc))
        else {
            return false;
        };

        let age = signals.observed_at.signed_duration_since(occurred_at);
        age > self.stale_after || -age > self.future_skew
    }
}
