use chainaudit_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{Event, EventId};
use crate::ledger::ChainLink;
use crate::risk::{RiskAnalysis, RiskLevel};

/// Regulatory applicability tags attached to an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFlags {
    /// GDPR applicability.
    pub gdpr: bool,
    /// SOX applicability.
    pub sox: bool,
    /// PCI applicability.
    pub pci: bool,
    /// HIPAA applicability.
    pub hipaa: bool,
}

/// Routing hint derived from the risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EscalationLevel {
    /// Handle through the regular review queue.
    Normal,
    /// Route to on-call reviewers right away.
    Immediate,
}

/// Review summary embedded in every audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Level copied from the analysis.
    pub overall_risk: RiskLevel,
    /// Score copied from the analysis.
    pub risk_score: u32,
    /// Whether a human has to look at the event.
    pub requires_review: bool,
    /// How urgently the review is needed.
    pub escalation_level: EscalationLevel,
}

impl RiskAssessment {
    /// Summarizes an analysis.
    #[must_use]
    pub fn from_analysis(analysis: &RiskAnalysis) -> Self {
        let high = analysis.risk_level() == RiskLevel::High;

        Self {
            overall_risk: analysis.risk_level(),
            risk_score: analysis.risk_score(),
            requires_review: high,
            escalation_level: if high {
                EscalationLevel::Immediate
            } else {
                EscalationLevel::Normal
            },
        }
    }
}

/// Audit record body as persisted and hashed in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFinding {
    /// Generated record identifier.
    pub audit_id: String,
    /// Identifier of the originating event.
    pub event_id: EventId,
    /// Record creation time.
    pub timestamp: DateTime<Utc>,
    /// The submitted event, embedded by value.
    pub original_event: Event,
    /// Risk analysis, embedded by value.
    pub analysis: RiskAnalysis,
    /// Compliance tags for the event type.
    pub compliance: ComplianceFlags,
    /// Review summary.
    pub risk_assessment: RiskAssessment,
}

impl AuditFinding {
    /// Serializes the finding into the JSON document stored in the ledger.
    pub fn to_document(&self) -> AppResult<Value> {
        serde_json::to_value(self).map_err(|error| {
            AppError::Internal(format!("failed to serialize audit finding: {error}"))
        })
    }

    /// Restores a finding from a stored ledger document.
    pub fn from_document(document: Value) -> AppResult<Self> {
        serde_json::from_value(document).map_err(|error| {
            AppError::Internal(format!("stored audit finding is malformed: {error}"))
        })
    }
}

/// Immutable audit record together with its ledger position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Persisted record body.
    #[serde(flatten)]
    pub finding: AuditFinding,
    /// Link returned by the ledger append.
    pub chain_link: ChainLink,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::{
        AuditFinding, AuditRecord, ComplianceFlags, EscalationLevel, RiskAssessment,
    };
    use crate::event::{Event, EventInput};
    use crate::ledger::ChainLink;
    use crate::risk::{RiskAnalysis, RiskLevel};

    fn finding(score: u32) -> AuditFinding {
        let event = Event::from_input(EventInput {
            event_id: Some("evt-100".to_owned()),
            event_type: Some("payment".to_owned()),
            ..EventInput::default()
        })
        .unwrap_or_else(|error| panic!("valid event rejected: {error}"));
        let analysis = RiskAnalysis::new(score, Vec::new(), 0.9);

        AuditFinding {
            audit_id: "audit_1_00".to_owned(),
            event_id: event.event_id().clone(),
            timestamp: Utc::now(),
            original_event: event,
            risk_assessment: RiskAssessment::from_analysis(&analysis),
            analysis,
            compliance: ComplianceFlags {
                gdpr: true,
                sox: true,
                pci: false,
                hipaa: true,
            },
        }
    }

    #[test]
    fn high_risk_requires_immediate_review() {
        let assessment = RiskAssessment::from_analysis(&RiskAnalysis::new(80, Vec::new(), 0.9));

        assert_eq!(assessment.overall_risk, RiskLevel::High);
        assert!(assessment.requires_review);
        assert_eq!(assessment.escalation_level, EscalationLevel::Immediate);
    }

    #[test]
    fn medium_risk_stays_normal() {
        let assessment = RiskAssessment::from_analysis(&RiskAnalysis::new(30, Vec::new(), 0.9));

        assert!(!assessment.requires_review);
        assert_eq!(assessment.escalation_level, EscalationLevel::Normal);
    }

    #[test]
    fn finding_survives_document_conversion() {
        let original = finding(10);
        let restored = original
            .to_document()
            .and_then(AuditFinding::from_document)
            .unwrap_or_else(|error| panic!("finding conversion failed: {error}"));

        assert_eq!(restored, original);
    }

    #[test]
    fn record_flattens_finding_next_to_chain_link() {
        let record = AuditRecord {
            finding: finding(60),
            chain_link: ChainLink {
                seq: 4,
                hash: "ab".repeat(32),
                prev_hash: None,
            },
        };
        let value = serde_json::to_value(&record).unwrap_or_default();

        assert_eq!(value["auditId"], json!("audit_1_00"));
        assert_eq!(value["riskAssessment"]["escalationLevel"], json!("IMMEDIATE"));
        assert_eq!(value["chainLink"]["seq"], json!(4));
        assert_eq!(value["chainLink"]["prevHash"], json!(null));
    }
}
