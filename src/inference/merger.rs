//! Folding AI answers into the candidate pools.
//!
//! AI output is parsed strictly; any malformed part rejects the whole
//! answer. Accepted guesses become ordinary claims with source `ai` and go
//! through the same pool and resolver as deterministic evidence. A citation
//! only counts when it names a locator the caller can verify; otherwise the
//! evidence item is tagged `none`, which keeps an uncited guess from ever
//! being confirmed.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::AiInferenceError;
use crate::evidence::{EvidenceItem, EvidenceSource};
use crate::normalize::{normalize_name, NormalizedClaim, MAX_NAME_LEN, MAX_NOTE_LEN};
use crate::pool::PoolSet;
use crate::retrieval::PublicSnippet;
use crate::role::Role;
use crate::tier::{Confidence, Strength};

/// Confidence assumed when the AI does not state one.
pub const AI_DEFAULT_CONFIDENCE: Confidence = Confidence::Low;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GuessWire {
    name: String,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    evidence: Vec<CitationWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CitationWire {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

/// A citation offered by the AI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCitation {
    /// Claimed source label.
    pub source: Option<String>,
    /// Claimed locator.
    pub path: Option<String>,
    /// Free-text note.
    pub note: Option<String>,
}

/// One structured AI guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiGuess {
    /// Proposed party name.
    pub name: String,
    /// Stated confidence.
    pub confidence: Confidence,
    /// Offered citations (possibly empty).
    pub citations: Vec<AiCitation>,
}

/// Parsed AI answer: `None` means "cannot determine".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiResponse {
    /// Guess per role named in the answer.
    pub guesses: BTreeMap<Role, Option<AiGuess>>,
}

fn unparsable(reason: impl Into<String>) -> AiInferenceError {
    AiInferenceError::Unparsable {
        reason: reason.into(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AiResponse {
    /// Parses `{ role: null | { name, confidence?, evidence? } }`.
    ///
    /// # Errors
    ///
    /// Returns `AiInferenceError::Unparsable` for any deviation.
    pub fn parse(value: &JsonValue) -> Result<Self, AiInferenceError> {
        let JsonValue::Object(map) = value else {
            return Err(unparsable("expected an object keyed by role"));
        };

        let mut guesses = BTreeMap::new();
        for (key, raw) in map {
            let role: Role = key
                .parse()
                .map_err(|_| unparsable(format!("unknown role '{key}'")))?;
            if guesses.contains_key(&role) {
                return Err(unparsable(format!("role '{role}' appears twice")));
            }

            let guess = match raw {
                JsonValue::Null => None,
                other => Some(Self::parse_guess(role, other)?),
            };
            guesses.insert(role, guess);
        }
        Ok(Self { guesses })
    }

    fn parse_guess(role: Role, raw: &JsonValue) -> Result<AiGuess, AiInferenceError> {
        let wire = GuessWire::deserialize(raw).map_err(|e| unparsable(format!("{role}: {e}")))?;

        let name = wire.name.trim().to_string();
        if normalize_name(&name).is_empty() {
            return Err(unparsable(format!("{role}: empty name")));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(unparsable(format!("{role}: name too long")));
        }

        let confidence = match non_blank(wire.confidence) {
            None => AI_DEFAULT_CONFIDENCE,
            Some(c) => c
                .parse()
                .map_err(|_| unparsable(format!("{role}: unknown confidence '{c}'")))?,
        };

        let citations = wire
            .evidence
            .into_iter()
            .map(|c| AiCitation {
                source: non_blank(c.source),
                path: non_blank(c.path),
                note: non_blank(c.note).map(|n| n.chars().take(MAX_NOTE_LEN).collect()),
            })
            .collect();

        Ok(AiGuess {
            name,
            confidence,
            citations,
        })
    }
}

/// Locators the caller can verify, with the strength they carry.
///
/// A deterministic locator only backs the role and the name it was
/// recorded for. Snippet URLs are not tied to a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationIndex {
    records: HashMap<(Role, String, String), Strength>,
    snippets: HashSet<String>,
}

impl CitationIndex {
    /// Indexes deterministic evidence paths and public snippet URLs.
    ///
    /// A snippet is scraped text and therefore `weak`; a deterministic
    /// locator keeps its own strength.
    #[must_use]
    pub fn build(pools: &PoolSet, snippets: &[PublicSnippet]) -> Self {
        let mut records: HashMap<(Role, String, String), Strength> = HashMap::new();
        for (role, pool) in pools.iter() {
            for candidate in pool.candidates() {
                for item in candidate
                    .evidence
                    .iter()
                    .filter(|e| e.source().is_deterministic())
                {
                    let key = (role, item.path().to_string(), candidate.normalized_key.clone());
                    let slot = records.entry(key).or_insert(item.strength());
                    *slot = (*slot).max(item.strength());
                }
            }
        }

        Self {
            records,
            snippets: snippets.iter().map(|s| s.url.clone()).collect(),
        }
    }

    /// Strength earned by citing `path` for `normalized_key` in `role`.
    ///
    /// Unknown locators, and deterministic locators recorded for another
    /// role or another name, earn `none`.
    #[must_use]
    pub fn strength_of(&self, role: Role, path: &str, normalized_key: &str) -> Strength {
        let recorded = self
            .records
            .get(&(role, path.to_string(), normalized_key.to_string()))
            .copied()
            .unwrap_or(Strength::None);
        if self.snippets.contains(path) {
            recorded.max(Strength::Weak)
        } else {
            recorded
        }
    }

    /// Number of citable locators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len() + self.snippets.len()
    }

    /// Returns true if nothing is citable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.snippets.is_empty()
    }
}

/// What the merger did with an AI answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Roles whose guess was folded in.
    pub merged: Vec<Role>,
    /// Roles the AI could not determine.
    pub declined: Vec<Role>,
    /// Roles answered without being requested (ignored).
    pub unrequested: Vec<Role>,
    /// Merged roles whose guess had no verifiable citation.
    pub uncited: Vec<Role>,
}

fn evidence_for(
    role: Role,
    guess: &AiGuess,
    normalized_key: &str,
    index: &CitationIndex,
) -> Vec<EvidenceItem> {
    if guess.citations.is_empty() {
        return vec![EvidenceItem::new(
            EvidenceSource::Ai,
            format!("ai.{role}"),
            Strength::None,
        )];
    }

    guess
        .citations
        .iter()
        .enumerate()
        .map(|(i, citation)| {
            let path = citation
                .path
                .clone()
                .unwrap_or_else(|| format!("ai.{role}[{i}]"));
            let strength = match (&citation.source, &citation.path) {
                (Some(_), Some(p)) => index.strength_of(role, p, normalized_key),
                _ => Strength::None,
            };
            let item = EvidenceItem::new(EvidenceSource::Ai, path, strength);
            match &citation.note {
                Some(note) => item.with_note(note.clone()),
                None => item,
            }
        })
        .collect()
}

/// Folds an AI answer into the pools for the requested roles.
pub fn merge_ai_response(
    pools: &mut PoolSet,
    response: AiResponse,
    requested: &[Role],
    index: &CitationIndex,
) -> MergeReport {
    let mut report = MergeReport::default();

    for (role, guess) in response.guesses {
        if !requested.contains(&role) {
            tracing::debug!(role = %role, "ignoring AI answer for unrequested role");
            report.unrequested.push(role);
            continue;
        }
        let Some(guess) = guess else {
            report.declined.push(role);
            continue;
        };

        let normalized_key = normalize_name(&guess.name);
        let evidence = evidence_for(role, &guess, &normalized_key, index);
        if evidence.iter().all(|e| !e.strength().is_citable()) {
            report.uncited.push(role);
        }

        for item in evidence {
            pools.add(NormalizedClaim {
                role,
                display_name: guess.name.clone(),
                normalized_key: normalized_key.clone(),
                confidence: guess.confidence,
                evidence: item,
            });
        }
        report.merged.push(role);
    }

    report
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::normalize::normalize_ais_static;

    fn snippet(url: &str) -> PublicSnippet {
        PublicSnippet {
            source: "web".to_string(),
            url: url.to_string(),
            title: "t".to_string(),
            snippet: "s".to_string(),
        }
    }

    #[test]
    fn test_parse_null_and_guess() {
        let response = AiResponse::parse(&json!({
            "operator": null,
            "manager": { "name": "Gamma Ship Management", "confidence": "medium" }
        }))
        .unwrap();

        assert_eq!(response.guesses[&Role::Operator], None);
        let guess = response.guesses[&Role::Manager].as_ref().unwrap();
        assert_eq!(guess.confidence, Confidence::Medium);
        assert!(guess.citations.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(AiResponse::parse(&json!("Alpha")).is_err());
        assert!(AiResponse::parse(&json!({ "flag": null })).is_err());
        assert!(AiResponse::parse(&json!({ "operator": { "name": "  " } })).is_err());
        assert!(AiResponse::parse(&json!({ "operator": { "name": "X", "confidence": "sure" } })).is_err());
        assert!(AiResponse::parse(&json!({ "operator": { "name": "X", "why": "hunch" } })).is_err());
        assert!(AiResponse::parse(&json!({ "owner": null, "registeredOwner": null })).is_err());
    }

    #[test]
    fn test_default_confidence_is_low() {
        let response = AiResponse::parse(&json!({ "operator": { "name": "X" } })).unwrap();
        let guess = response.guesses[&Role::Operator].as_ref().unwrap();
        assert_eq!(guess.confidence, AI_DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_citation_index() {
        let pools = PoolSet::from_claims(
            normalize_ais_static(&json!({ "operator": "Delta Lines" })).claims,
        );
        let index = CitationIndex::build(&pools, &[snippet("https://news.example/delta")]);

        let delta = normalize_name("Delta Lines");

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.strength_of(Role::Operator, "ais_static.operator", &delta),
            Strength::Medium
        );
        assert_eq!(
            index.strength_of(Role::Manager, "https://news.example/delta", "anything"),
            Strength::Weak
        );
        assert_eq!(
            index.strength_of(Role::Operator, "https://made-up.example", &delta),
            Strength::None
        );
    }

    #[test]
    fn test_deterministic_locator_only_backs_its_role_and_name() {
        let pools = PoolSet::from_claims(
            normalize_ais_static(&json!({ "operator": "Delta Lines" })).claims,
        );
        let index = CitationIndex::build(&pools, &[]);

        assert_eq!(
            index.strength_of(Role::BeneficialOwner, "ais_static.operator", &normalize_name("Delta Lines")),
            Strength::None
        );
        assert_eq!(
            index.strength_of(Role::Operator, "ais_static.operator", &normalize_name("Omega Holdings")),
            Strength::None
        );
    }

    #[test]
    fn test_guess_citing_another_roles_path_stays_uncited() {
        let mut pools = PoolSet::from_claims(
            normalize_ais_static(&json!({ "operator": "Delta Lines" })).claims,
        );
        let index = CitationIndex::build(&pools, &[]);
        let response = AiResponse::parse(&json!({
            "beneficialOwner": {
                "name": "Omega Holdings",
                "evidence": [{ "source": "ais", "path": "ais_static.operator" }]
            }
        }))
        .unwrap();

        let report = merge_ai_response(&mut pools, response, &[Role::BeneficialOwner], &index);

        assert_eq!(report.uncited, vec![Role::BeneficialOwner]);
        let candidate = &pools.pool(Role::BeneficialOwner).unwrap().candidates()[0];
        assert_eq!(candidate.evidence[0].strength(), Strength::None);
        assert!(candidate.is_unverified());
    }

    #[test]
    fn test_uncited_guess_tagged_none() {
        let mut pools = PoolSet::new();
        let response = AiResponse::parse(&json!({
            "beneficialOwner": { "name": "Omega Holdings", "confidence": "high" }
        }))
        .unwrap();

        let report = merge_ai_response(
            &mut pools,
            response,
            &[Role::BeneficialOwner],
            &CitationIndex::default(),
        );

        assert_eq!(report.merged, vec![Role::BeneficialOwner]);
        assert_eq!(report.uncited, vec![Role::BeneficialOwner]);
        let candidate = &pools.pool(Role::BeneficialOwner).unwrap().candidates()[0];
        assert_eq!(candidate.evidence.len(), 1);
        assert_eq!(candidate.evidence[0].strength(), Strength::None);
        assert_eq!(candidate.evidence[0].source(), EvidenceSource::Ai);
        assert_eq!(candidate.evidence[0].path(), "ai.beneficialOwner");
    }

    #[test]
    fn test_fabricated_citation_is_none_and_verified_is_weak() {
        let mut pools = PoolSet::new();
        let index = CitationIndex::build(&pools, &[snippet("https://news.example/omega")]);
        let response = AiResponse::parse(&json!({
            "manager": {
                "name": "Omega Management",
                "evidence": [
                    { "source": "web", "path": "https://news.example/omega", "note": "named as manager" },
                    { "source": "web", "path": "https://invented.example/omega" },
                    { "path": "https://news.example/omega" }
                ]
            }
        }))
        .unwrap();

        let report = merge_ai_response(&mut pools, response, &[Role::Manager], &index);
        assert!(report.uncited.is_empty());

        let candidate = &pools.pool(Role::Manager).unwrap().candidates()[0];
        let strengths: Vec<Strength> = candidate.evidence.iter().map(EvidenceItem::strength).collect();
        assert_eq!(strengths, vec![Strength::Weak, Strength::None, Strength::None]);
        assert_eq!(candidate.evidence[0].note(), Some("named as manager"));
    }

    #[test]
    fn test_unrequested_and_declined_roles() {
        let mut pools = PoolSet::new();
        let response = AiResponse::parse(&json!({
            "operator": { "name": "Delta Lines" },
            "manager": null
        }))
        .unwrap();

        let report = merge_ai_response(&mut pools, response, &[Role::Manager], &CitationIndex::default());

        assert_eq!(report.unrequested, vec![Role::Operator]);
        assert_eq!(report.declined, vec![Role::Manager]);
        assert!(pools.pool(Role::Operator).unwrap().is_empty());
    }
}
