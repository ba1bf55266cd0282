//! PartiesResult, the structured response of a resolution request.
//!
//! A result is built fresh per request. For every role it carries either a
//! single trusted answer, a ranked list of conflicting candidates, or
//! nothing, together with the status of the optional retrieval and AI
//! steps and the evidence lineage behind every name.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::contacts::Contact;
use crate::error::SchemaViolation;
use crate::evidence::EvidenceItem;
use crate::identity::ShipIdentity;
use crate::pool::PartyCandidate;
use crate::retrieval::PublicSnippet;
use crate::role::Role;
use crate::tier::Confidence;

/// How far an answer can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyStatus {
    /// Backed by at least one citable evidence item.
    Confirmed,
    /// AI guess with no citable evidence; must be shown as unverified.
    AiInferredNoEvidence,
}

impl fmt::Display for PartyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::AiInferredNoEvidence => write!(f, "ai_inferred_no_evidence"),
        }
    }
}

/// The single answer slot for a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyAnswer {
    /// Display name.
    pub name: String,
    /// Trust status.
    pub status: PartyStatus,
    /// Merged confidence.
    pub confidence: Confidence,
    /// Supporting evidence (never empty).
    pub evidence: Vec<EvidenceItem>,
}

impl PartyAnswer {
    /// Returns true if the answer is confirmed by citable evidence.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == PartyStatus::Confirmed
    }
}

/// Whether and how the AI step ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiStatus {
    /// AI was asked and answered.
    Ok,
    /// AI was asked and failed; deterministic results stand.
    Failed,
    /// Mode forbids AI.
    Skipped,
    /// Policy found nothing worth asking.
    NotRequested,
}

impl fmt::Display for AiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::NotRequested => write!(f, "not_requested"),
        }
    }
}

/// Whether any public-source text was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStatus {
    /// At least one snippet was returned.
    Ok,
    /// No snippet (no sources, all failed, or nothing found).
    Empty,
}

impl fmt::Display for RetrievalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// Per-ship aggregate of party answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartiesResult {
    /// Normalized ship identity.
    pub identity: ShipIdentity,
    /// One slot per role; `None` when no single trusted answer exists.
    pub parties: BTreeMap<Role, Option<PartyAnswer>>,
    /// Ranked candidates, present only for roles in conflict.
    #[serde(default)]
    pub candidates: BTreeMap<Role, Vec<PartyCandidate>>,
    /// AI step status.
    pub ai_status: AiStatus,
    /// Retrieval step status.
    pub retrieval_status: RetrievalStatus,
    /// Contacts read from strong official evidence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<Contact>,
    /// Human-readable notes.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Dropped items and recovered failures.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PartiesResult {
    /// Creates a result with every role empty.
    #[must_use]
    pub fn empty(identity: ShipIdentity) -> Self {
        Self {
            identity,
            parties: Role::ALL.iter().map(|&r| (r, None)).collect(),
            candidates: BTreeMap::new(),
            ai_status: AiStatus::NotRequested,
            retrieval_status: RetrievalStatus::Empty,
            contacts: Vec::new(),
            notes: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Answer for a role, if confirmed or AI-inferred.
    #[must_use]
    pub fn party(&self, role: Role) -> Option<&PartyAnswer> {
        self.parties.get(&role).and_then(Option::as_ref)
    }

    /// Conflicting candidates for a role, if any.
    #[must_use]
    pub fn candidates_for(&self, role: Role) -> Option<&[PartyCandidate]> {
        self.candidates.get(&role).map(Vec::as_slice)
    }

    /// Number of roles with an answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.parties.values().filter(|p| p.is_some()).count()
    }

    /// Checks the output invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        crate::validate::validate(self)
    }

    /// Returns true if every output invariant holds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Canonical JSON encoding.
    ///
    /// Maps are ordered by role, so equal results encode to equal bytes.
    #[must_use]
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// blake3 hex digest of the canonical JSON.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.to_canonical_json().as_bytes())
            .to_hex()
            .to_string()
    }
}

/// Version 2 response body: the result plus raw public evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartiesReport {
    /// The resolved parties.
    #[serde(flatten)]
    pub result: PartiesResult,
    /// Snippets returned by retrieval, for transparency.
    #[serde(default)]
    pub public_evidence: Vec<PublicSnippet>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceSource;
    use crate::tier::Strength;

    fn identity() -> ShipIdentity {
        ShipIdentity::by_imo("9074729").unwrap()
    }

    #[test]
    fn test_empty_result_has_every_role() {
        let result = PartiesResult::empty(identity());
        assert_eq!(result.parties.len(), Role::ALL.len());
        assert_eq!(result.answered_count(), 0);
        assert!(result.is_valid());
    }

    #[test]
    fn test_serialized_shape() {
        let mut result = PartiesResult::empty(identity());
        result.parties.insert(
            Role::Operator,
            Some(PartyAnswer {
                name: "Delta Lines".to_string(),
                status: PartyStatus::Confirmed,
                confidence: Confidence::Medium,
                evidence: vec![EvidenceItem::new(
                    EvidenceSource::AisStatic,
                    "ais_static.operator",
                    Strength::Medium,
                )],
            }),
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["identity"]["imo"], "9074729");
        assert_eq!(json["parties"]["operator"]["status"], "confirmed");
        assert!(json["parties"]["registeredOwner"].is_null());
        assert_eq!(json["ai_status"], "not_requested");
        assert_eq!(json["retrieval_status"], "empty");
        assert!(json.get("contacts").is_none());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = PartiesResult::empty(identity());
        let b = PartiesResult::empty(identity());
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = PartiesResult::empty(identity());
        c.notes.push("changed".to_string());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_report_flattens_result() {
        let report = PartiesReport {
            result: PartiesResult::empty(identity()),
            public_evidence: Vec::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("parties").is_some());
        assert!(json.get("public_evidence").is_some());
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(AiStatus::NotRequested.to_string(), "not_requested");
        assert_eq!(PartyStatus::AiInferredNoEvidence.to_string(), "ai_inferred_no_evidence");
        assert_eq!(RetrievalStatus::Empty.to_string(), "empty");
    }
}
