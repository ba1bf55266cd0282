//! AI gate and merger.
//!
//! The gate decides, per role, whether an AI inference is worth asking
//! for; the merger folds an answer back into the candidate pools so it is
//! resolved by the same rules as every other source.

mod collaborator;
mod merger;
mod policies;

pub use collaborator::{infer_with_deadline, AiCollaborator, AiRequest, CachedAiCollaborator};
pub use merger::{
    merge_ai_response, AiCitation, AiGuess, AiResponse, CitationIndex, MergeReport,
    AI_DEFAULT_CONFIDENCE,
};
pub use policies::{plan_ai, AiPlan, Mode, RoleState};
