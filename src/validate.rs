//! Output invariant checks.
//!
//! Every assembled `PartiesResult` passes through [`validate`] before it
//! leaves the engine. A failure is a defect in the engine, reported as a
//! `SchemaViolation`.

use crate::error::SchemaViolation;
use crate::frame::{PartiesResult, PartyStatus};
use crate::role::Role;
use crate::tier::Strength;

fn check_answers(result: &PartiesResult) -> Result<(), SchemaViolation> {
    for (&role, answer) in &result.parties {
        let Some(answer) = answer else {
            continue;
        };
        if answer.evidence.is_empty() {
            return Err(SchemaViolation::AnswerWithoutEvidence { role });
        }
        let any_citable = answer.evidence.iter().any(|e| e.strength().is_citable());
        match answer.status {
            PartyStatus::Confirmed if !any_citable => {
                return Err(SchemaViolation::ConfirmedWithoutSupport { role });
            }
            PartyStatus::AiInferredNoEvidence if any_citable => {
                return Err(SchemaViolation::UnverifiedWithSupport { role });
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_candidates(result: &PartiesResult) -> Result<(), SchemaViolation> {
    for (&role, candidates) in &result.candidates {
        if candidates.len() < 2 {
            return Err(SchemaViolation::CandidateListTooShort {
                role,
                len: candidates.len(),
            });
        }
        if result.party(role).is_some() {
            return Err(SchemaViolation::ConfirmedDuringConflict { role });
        }
        if candidates.windows(2).any(|w| w[0].score < w[1].score) {
            return Err(SchemaViolation::CandidatesUnsorted { role });
        }
        if let Some(bare) = candidates.iter().find(|c| c.evidence.is_empty()) {
            return Err(SchemaViolation::CandidateWithoutEvidence {
                role,
                name: bare.name.clone(),
            });
        }
    }
    Ok(())
}

fn has_strong_locator(result: &PartiesResult, role: Role, path: &str) -> bool {
    let answer = result.party(role).into_iter().flat_map(|a| a.evidence.iter());
    let candidates = result
        .candidates_for(role)
        .unwrap_or_default()
        .iter()
        .flat_map(|c| c.evidence.iter());

    answer
        .chain(candidates)
        .any(|e| {
            e.strength() == Strength::Strong && e.source().is_deterministic() && e.path() == path
        })
}

fn check_contacts(result: &PartiesResult) -> Result<(), SchemaViolation> {
    match result
        .contacts
        .iter()
        .find(|c| !has_strong_locator(result, c.role, &c.source_path))
    {
        Some(contact) => Err(SchemaViolation::ContactWithoutStrongEvidence {
            path: contact.source_path.clone(),
        }),
        None => Ok(()),
    }
}

/// Checks every output invariant of `result`.
///
/// # Errors
///
/// Returns the first violated invariant, checking answers, then
/// candidate lists, then contacts.
pub fn validate(result: &PartiesResult) -> Result<(), SchemaViolation> {
    check_answers(result)?;
    check_candidates(result)?;
    check_contacts(result)
}
