//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod document;
mod event;
mod ledger;
mod risk;

pub use audit::{AuditFinding, AuditRecord, ComplianceFlags, EscalationLevel, RiskAssessment};
pub use document::{Document, canonical_json};
pub use event::{DEFAULT_EVENT_PRIORITY, Event, EventId, EventInput};
pub use ledger::{
    ChainLink, ChainVerification, ChainVerifier, LedgerEntry, compute_link_hash, hash_timestamp,
    truncate_to_micros, verify_entries,
};
pub use risk::{
    HIGH_RISK_THRESHOLD, MAX_CONFIDENCE, MEDIUM_RISK_THRESHOLD, MIN_CONFIDENCE, RiskAnalysis,
    RiskLevel,
};
