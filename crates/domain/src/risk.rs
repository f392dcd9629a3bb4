use serde::{Deserialize, Serialize};

/// Lowest score classified as [`RiskLevel::Medium`].
pub const MEDIUM_RISK_THRESHOLD: u32 = 25;
/// Lowest score classified as [`RiskLevel::High`].
pub const HIGH_RISK_THRESHOLD: u32 = 50;

/// Lower bound applied to every confidence value.
pub const MIN_CONFIDENCE: f64 = 0.1;
/// Upper bound applied to every confidence value.
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Coarse classification of a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Score below the medium threshold.
    Low,
    /// Score between the medium and high thresholds.
    Medium,
    /// Score at or above the high threshold.
    High,
}

impl RiskLevel {
    /// Classifies a risk score.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Returns the fixed recommendations for this level.
    #[must_use]
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            Self::Low => &["Continue standard monitoring"],
            Self::Medium => &[
                "Review event within 24 hours",
                "Verify actor identity through a secondary channel",
            ],
            Self::High => &[
                "Escalate to the security team immediately",
                "Suspend related sessions pending review",
                "Require manual approval before further processing",
            ],
        }
    }
}

/// Result of scoring one event.
///
/// Deserialization rejects analyses whose level, recommendations or
/// confidence disagree with the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RiskAnalysisWire")]
pub struct RiskAnalysis {
    risk_score: u32,
    risk_level: RiskLevel,
    risk_factors: Vec<String>,
    confidence: f64,
    recommendations: Vec<String>,
}

impl RiskAnalysis {
    /// Builds an analysis from a score, the triggered factors and a raw
    /// confidence value.
    ///
    /// Level and recommendations are derived from the score; confidence is
    /// clamped and rounded to two decimals.
    #[must_use]
    pub fn new(risk_score: u32, risk_factors: Vec<String>, confidence: f64) -> Self {
        let risk_level = RiskLevel::from_score(risk_score);
        let recommendations = risk_level
            .recommendations()
            .iter()
            .map(|recommendation| (*recommendation).to_owned())
            .collect();

        Self {
            risk_score,
            risk_level,
            risk_factors,
            confidence: normalize_confidence(confidence),
            recommendations,
        }
    }

    /// Returns the summed factor weight.
    #[must_use]
    pub fn risk_score(&self) -> u32 {
        self.risk_score
    }

    /// Returns the classified level.
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Returns triggered factor names in evaluation order.
    #[must_use]
    pub fn risk_factors(&self) -> &[String] {
        &self.risk_factors
    }

    /// Returns the confidence in [0.1, 1.0].
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Returns the level-derived recommendations.
    #[must_use]
    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RiskAnalysisWire {
    risk_score: u32,
    risk_level: RiskLevel,
    #[serde(default)]
    risk_factors: Vec<String>,
    confidence: f64,
    recommendations: Vec<String>,
}

impl TryFrom<RiskAnalysisWire> for RiskAnalysis {
    type Error = String;

    fn try_from(wire: RiskAnalysisWire) -> Result<Self, Self::Error> {
        if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&wire.confidence) {
            return Err(format!(
                "confidence {} is outside [{MIN_CONFIDENCE}, {MAX_CONFIDENCE}]",
                wire.confidence
            ));
        }

        let analysis = Self::new(wire.risk_score, wire.risk_factors, wire.confidence);
        if analysis.risk_level != wire.risk_level {
            return Err(format!(
                "riskLevel {} does not match riskScore {} (expected {})",
                wire.risk_level.as_str(),
                wire.risk_score,
                analysis.risk_level.as_str()
            ));
        }

        if analysis.recommendations != wire.recommendations {
            return Err(format!(
                "recommendations do not match riskLevel {}",
                analysis.risk_level.as_str()
            ));
        }

        Ok(analysis)
    }
}

fn normalize_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return MIN_CONFIDENCE;
    }

    let clamped = confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
    (clamped * 100.0).round() / 100.0
}
