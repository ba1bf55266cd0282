//! Conflict resolver.
//!
//! Turns one role's candidate pool into a resolution: a single answer when
//! exactly one candidate group exists, a ranked conflict when two or more
//! exist, or nothing. The resolver is pure: identical pools always resolve
//! identically. The same function handles pools with and without AI
//! evidence, so the no-evidence demotion applies uniformly.

use crate::frame::{PartyAnswer, PartyStatus};
use crate::pool::{CandidatePool, PartyCandidate};

/// Outcome of resolving one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one candidate group.
    Answered(PartyAnswer),
    /// Two or more groups, ranked by score descending.
    Conflict(Vec<PartyCandidate>),
    /// No claim at all.
    Empty,
}

impl Resolution {
    /// Returns true if a single answer was produced.
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        matches!(self, Self::Answered(_))
    }

    /// Returns true if the role is in conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Splits into the answer slot and the candidate list.
    #[must_use]
    pub fn into_parts(self) -> (Option<PartyAnswer>, Option<Vec<PartyCandidate>>) {
        match self {
            Self::Answered(answer) => (Some(answer), None),
            Self::Conflict(candidates) => (None, Some(candidates)),
            Self::Empty => (None, None),
        }
    }
}

/// Sorts candidates by score descending.
///
/// The sort is stable, so equal scores keep first-seen order.
#[must_use]
pub fn rank_candidates(mut candidates: Vec<PartyCandidate>) -> Vec<PartyCandidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Builds the answer for a sole candidate.
///
/// A candidate whose evidence is entirely uncited is never `Confirmed`.
#[must_use]
pub fn answer_from(candidate: PartyCandidate) -> PartyAnswer {
    let status = if candidate.is_unverified() {
        PartyStatus::AiInferredNoEvidence
    } else {
        PartyStatus::Confirmed
    };

    PartyAnswer {
        name: candidate.name,
        status,
        confidence: candidate.confidence,
        evidence: candidate.evidence,
    }
}

/// Resolves a role's pool.
#[must_use]
pub fn resolve_pool(pool: &CandidatePool) -> Resolution {
    let mut candidates = pool.candidates();
    match candidates.len() {
        0 => Resolution::Empty,
        1 => match candidates.pop() {
            Some(only) => Resolution::Answered(answer_from(only)),
            None => Resolution::Empty,
        },
        n => {
            tracing::debug!(role = %pool.role(), candidates = n, "role in conflict");
            Resolution::Conflict(rank_candidates(candidates))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{EvidenceItem, EvidenceSource};
    use crate::normalize::{normalize_name, NormalizedClaim};
    use crate::role::Role;
    use crate::tier::{Confidence, Strength};

    fn claim(name: &str, confidence: Confidence, source: EvidenceSource, strength: Strength) -> NormalizedClaim {
        NormalizedClaim {
            role: Role::RegisteredOwner,
            display_name: name.to_string(),
            normalized_key: normalize_name(name),
            confidence,
            evidence: EvidenceItem::new(source, format!("{source}.{name}"), strength),
        }
    }

    fn pool_of(claims: Vec<NormalizedClaim>) -> CandidatePool {
        let mut pool = CandidatePool::new(Role::RegisteredOwner);
        for c in claims {
            pool.add(c);
        }
        pool
    }

    #[test]
    fn test_empty_pool() {
        let pool = CandidatePool::new(Role::RegisteredOwner);
        assert_eq!(resolve_pool(&pool), Resolution::Empty);
    }

    #[test]
    fn test_single_source_confirmation() {
        let pool = pool_of(vec![claim(
            "Alpha Shipping",
            Confidence::Medium,
            EvidenceSource::AisStatic,
            Strength::Medium,
        )]);

        let Resolution::Answered(answer) = resolve_pool(&pool) else {
            panic!("expected an answer");
        };
        assert_eq!(answer.name, "Alpha Shipping");
        assert_eq!(answer.status, PartyStatus::Confirmed);
        assert_eq!(answer.evidence.len(), 1);
    }

    #[test]
    fn test_conflict_ranked_by_score() {
        let pool = pool_of(vec![
            claim("Alpha Shipping", Confidence::Medium, EvidenceSource::AisStatic, Strength::Medium),
            claim("Beta Shipping", Confidence::High, EvidenceSource::External, Strength::Weak),
        ]);

        let (answer, candidates) = resolve_pool(&pool).into_parts();
        assert!(answer.is_none());
        let candidates = candidates.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Beta Shipping");
        assert_eq!(candidates[1].name, "Alpha Shipping");
    }

    #[test]
    fn test_equal_scores_keep_first_seen_order() {
        let pool = pool_of(vec![
            claim("Zeta", Confidence::Low, EvidenceSource::External, Strength::Weak),
            claim("Eta", Confidence::Low, EvidenceSource::External, Strength::Weak),
            claim("Theta", Confidence::Low, EvidenceSource::External, Strength::Weak),
        ]);

        let (_, candidates) = resolve_pool(&pool).into_parts();
        let names: Vec<String> = candidates.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Zeta", "Eta", "Theta"]);
    }

    #[test]
    fn test_uncited_sole_candidate_is_demoted() {
        let pool = pool_of(vec![claim(
            "Omega Holdings",
            Confidence::High,
            EvidenceSource::Ai,
            Strength::None,
        )]);

        let Resolution::Answered(answer) = resolve_pool(&pool) else {
            panic!("expected an answer");
        };
        assert_eq!(answer.status, PartyStatus::AiInferredNoEvidence);
        assert!(!answer.is_confirmed());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let build = || {
            pool_of(vec![
                claim("Alpha", Confidence::Medium, EvidenceSource::AisStatic, Strength::Medium),
                claim("Beta", Confidence::Medium, EvidenceSource::External, Strength::Weak),
                claim("alpha", Confidence::Low, EvidenceSource::External, Strength::Weak),
            ])
        };
        assert_eq!(resolve_pool(&build()), resolve_pool(&build()));
    }
}
