//! Hash-chain primitives: link hashing and integrity walking.
//!
//! Hash input layout, concatenated as UTF-8 and fed into SHA-256:
//!   1. event identifier
//!   2. previous link hash, or the empty string for the first entry
//!   3. canonical JSON of the finding
//!   4. `occurred_at` as RFC 3339 with microsecond precision and `Z`

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::document::canonical_json;

/// Position of a record in the ledger as returned by an append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLink {
    /// Ledger sequence number, starting at 1.
    pub seq: i64,
    /// Lowercase hex SHA-256 of this entry.
    pub hash: String,
    /// Hash of the preceding entry, absent for the first entry.
    pub prev_hash: Option<String>,
}

/// One persisted ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Ledger sequence number, starting at 1.
    pub seq: i64,
    /// Identifier of the event this entry records.
    pub event_id: String,
    /// Hash of the preceding entry.
    pub prev_hash: Option<String>,
    /// Hash of this entry.
    pub hash: String,
    /// Stored finding document.
    pub finding: Value,
    /// Canonical serialization of `finding` that was hashed.
    #[serde(skip)]
    pub finding_canonical: String,
    /// Server time of the append.
    pub occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Builds the entry that follows `prev_hash`, computing its hash.
    ///
    /// `occurred_at` is truncated to microseconds so the hashed timestamp
    /// survives a round trip through storage unchanged.
    #[must_use]
    pub fn seal(
        seq: i64,
        event_id: impl Into<String>,
        prev_hash: Option<String>,
        finding: Value,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let event_id = event_id.into();
        let occurred_at = truncate_to_micros(occurred_at);
        let finding_canonical = canonical_json(&finding);
        let hash = compute_link_hash(
            event_id.as_str(),
            prev_hash.as_deref(),
            finding_canonical.as_str(),
            &occurred_at,
        );

        Self {
            seq,
            event_id,
            prev_hash,
            hash,
            finding,
            finding_canonical,
            occurred_at,
        }
    }

    /// Returns the chain link of this entry.
    #[must_use]
    pub fn link(&self) -> ChainLink {
        ChainLink {
            seq: self.seq,
            hash: self.hash.clone(),
            prev_hash: self.prev_hash.clone(),
        }
    }

    /// Recomputes the hash from the stored fields.
    #[must_use]
    pub fn recompute_hash(&self) -> String {
        compute_link_hash(
            self.event_id.as_str(),
            self.prev_hash.as_deref(),
            self.finding_canonical.as_str(),
            &self.occurred_at,
        )
    }

    /// Returns whether the stored document still matches the hashed text.
    #[must_use]
    pub fn finding_matches_canonical(&self) -> bool {
        serde_json::from_str::<Value>(self.finding_canonical.as_str())
            .is_ok_and(|hashed| hashed == self.finding)
    }
}

/// Computes the hash of one ledger link.
#[must_use]
pub fn compute_link_hash(
    event_id: &str,
    prev_hash: Option<&str>,
    canonical_finding: &str,
    occurred_at: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(event_id.as_bytes());
    hasher.update(prev_hash.unwrap_or_default().as_bytes());
    hasher.update(canonical_finding.as_bytes());
    hasher.update(hash_timestamp(occurred_at).as_bytes());

    hex::encode(hasher.finalize())
}

/// Renders the timestamp component of a link hash.
#[must_use]
pub fn hash_timestamp(occurred_at: &DateTime<Utc>) -> String {
    occurred_at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drops sub-microsecond precision, which storage does not keep.
#[must_use]
pub fn truncate_to_micros(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(value.timestamp_micros()).unwrap_or(value)
}

/// Outcome of walking a range of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    /// Whether every walked entry is linked and hashes correctly.
    pub valid: bool,
    /// Number of entries inspected.
    pub entries_checked: u64,
    /// Sequence number of the first entry that failed.
    pub first_broken_seq: Option<i64>,
    /// Why the first failing entry failed.
    pub reason: Option<String>,
}

/// Incremental integrity walker fed with entries in ascending `seq` order.
///
/// Checks contiguity of `seq`, `prev_hash` linkage, hash recomputation and
/// that the stored document matches the hashed text. Stops recording after
/// the first failure.
#[derive(Debug, Clone)]
pub struct ChainVerifier {
    expected_seq: i64,
    expected_prev_hash: Option<String>,
    entries_checked: u64,
    broken: Option<(i64, String)>,
}

impl ChainVerifier {
    /// Starts a walk at the first ledger entry.
    #[must_use]
    pub fn from_genesis() -> Self {
        Self {
            expected_seq: 1,
            expected_prev_hash: None,
            entries_checked: 0,
            broken: None,
        }
    }

    /// Starts a walk at the entry following `anchor`.
    #[must_use]
    pub fn anchored_at(anchor: &LedgerEntry) -> Self {
        Self {
            expected_seq: anchor.seq + 1,
            expected_prev_hash: Some(anchor.hash.clone()),
            entries_checked: 0,
            broken: None,
        }
    }

    /// Creates a walker that is already broken, e.g. when the anchor entry
    /// for a range is missing.
    #[must_use]
    pub fn broken_at(seq: i64, reason: impl Into<String>) -> Self {
        Self {
            expected_seq: seq,
            expected_prev_hash: None,
            entries_checked: 0,
            broken: Some((seq, reason.into())),
        }
    }

    /// Checks the next entry. Returns `false` once the chain is broken.
    pub fn feed(&mut self, entry: &LedgerEntry) -> bool {
        if self.broken.is_some() {
            return false;
        }

        self.entries_checked += 1;

        let failure = if entry.seq != self.expected_seq {
            Some(format!(
                "expected seq {} but found {}",
                self.expected_seq, entry.seq
            ))
        } else if entry.prev_hash != self.expected_prev_hash {
            Some("prev_hash does not match the preceding entry".to_owned())
        } else if !entry.finding_matches_canonical() {
            Some("stored finding differs from the hashed content".to_owned())
        } else if entry.recompute_hash() != entry.hash {
            Some("stored hash does not match recomputed hash".to_owned())
        } else {
            None
        };

        if let Some(reason) = failure {
            self.broken = Some((entry.seq, reason));
            return false;
        }

        self.expected_seq = entry.seq + 1;
        self.expected_prev_hash = Some(entry.hash.clone());
        true
    }

    /// Returns whether a failure has been recorded.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken.is_some()
    }

    /// Completes the walk.
    #[must_use]
    pub fn finish(self) -> ChainVerification {
        match self.broken {
            Some((seq, reason)) => ChainVerification {
                valid: false,
                entries_checked: self.entries_checked,
                first_broken_seq: Some(seq),
                reason: Some(reason),
            },
            None => ChainVerification {
                valid: true,
                entries_checked: self.entries_checked,
                first_broken_seq: None,
                reason: None,
            },
        }
    }
}

/// Verifies a complete chain held in memory, starting at the first entry.
#[must_use]
pub fn verify_entries(entries: &[LedgerEntry]) -> ChainVerification {
    let mut verifier = ChainVerifier::from_genesis();
    for entry in entries {
        if !verifier.feed(entry) {
            break;
        }
    }

    verifier.finish()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    use super::{
        ChainVerifier, LedgerEntry, compute_link_hash, hash_timestamp, truncate_to_micros,
        verify_entries,
    };

    fn build_chain(length: usize) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = Vec::with_capacity(length);
        for index in 0..length {
            let prev_hash = entries.last().map(|entry| entry.hash.clone());
            let occurred_at = Utc
                .timestamp_opt(1_700_000_000 + index as i64, 123_456_789)
                .single()
                .unwrap_or_default();
            entries.push(LedgerEntry::seal(
                index as i64 + 1,
                format!("evt-{index:03}"),
                prev_hash,
                json!({"index": index, "note": "ok"}),
                occurred_at,
            ));
        }
        entries
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        let at = Utc.timestamp_opt(0, 0).single().unwrap_or_default();
        let hash = compute_link_hash("evt-1", None, "{}", &at);

        assert_eq!(hash.len(), 64);
        assert!(
            hash.chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn hash_commits_to_previous_hash() {
        let at = Utc.timestamp_opt(0, 0).single().unwrap_or_default();
        let genesis = compute_link_hash("evt-1", None, "{}", &at);
        let linked = compute_link_hash("evt-1", Some("abc"), "{}", &at);

        assert_ne!(genesis, linked);
    }

    #[test]
    fn timestamp_is_rendered_with_microseconds() {
        let at = Utc
            .timestamp_opt(1_700_000_000, 123_456_789)
            .single()
            .unwrap_or_default();

        assert_eq!(
            hash_timestamp(&truncate_to_micros(at)),
            "2023-11-14T22:13:20.123456Z"
        );
    }

    #[test]
    fn well_formed_chain_verifies() {
        let entries = build_chain(5);
        let verification = verify_entries(&entries);

        assert!(verification.valid);
        assert_eq!(verification.entries_checked, 5);
        assert_eq!(entries[0].prev_hash, None);
        assert_eq!(entries[4].prev_hash.as_deref(), Some(entries[3].hash.as_str()));
    }

    #[test]
    fn empty_chain_is_valid() {
        let verification = verify_entries(&[]);
        assert!(verification.valid);
        assert_eq!(verification.entries_checked, 0);
    }

    #[test]
    fn tampered_finding_is_detected() {
        let mut entries = build_chain(4);
        entries[2].finding = json!({"index": 2, "note": "edited"});

        let verification = verify_entries(&entries);
        assert!(!verification.valid);
        assert_eq!(verification.first_broken_seq, Some(3));
    }

    #[test]
    fn rewritten_finding_with_fresh_hash_breaks_the_next_link() {
        let mut entries = build_chain(4);
        let forged = LedgerEntry::seal(
            2,
            entries[1].event_id.clone(),
            entries[1].prev_hash.clone(),
            json!({"forged": true}),
            entries[1].occurred_at,
        );
        entries[1] = forged;

        let verification = verify_entries(&entries);
        assert!(!verification.valid);
        assert_eq!(verification.first_broken_seq, Some(3));
    }

    #[test]
    fn gap_in_sequence_is_detected() {
        let mut entries = build_chain(4);
        entries.remove(1);

        let verification = verify_entries(&entries);
        assert!(!verification.valid);
        assert_eq!(verification.first_broken_seq, Some(3));
    }

    #[test]
    fn anchored_walk_checks_link_to_anchor() {
        let entries = build_chain(6);
        let mut verifier = ChainVerifier::anchored_at(&entries[2]);
        for entry in &entries[3..] {
            assert!(verifier.feed(entry));
        }

        let verification = verifier.finish();
        assert!(verification.valid);
        assert_eq!(verification.entries_checked, 3);

        let mut wrong_anchor = ChainVerifier::anchored_at(&entries[1]);
        assert!(!wrong_anchor.feed(&entries[3]));
        assert!(wrong_anchor.is_broken());
    }

    proptest! {
        #[test]
        fn any_prefix_of_a_sealed_chain_verifies(length in 0usize..24) {
            let entries = build_chain(length);
            let verification = verify_entries(&entries);

            prop_assert!(verification.valid);
            prop_assert_eq!(verification.entries_checked, length as u64);
        }
    }
}
