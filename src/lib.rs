//! # Ship Parties - evidence-traceable resolution of vessel parties
//!
//! Given uncertain and possibly contradictory claims about who owns,
//! operates and manages a vessel, the engine produces at most one trusted
//! answer per role, a ranked candidate list where sources disagree, and
//! the evidence lineage behind every name. AI guesses are folded in through
//! the same resolver as deterministic evidence and are never confirmed
//! without a citation the caller can verify.
//!
//! ## Core Concepts
//!
//! - **Role**: one of five party relationships (registered owner, beneficial
//!   owner, operator, manager, bareboat charterer)
//! - **EvidenceItem**: one sourced claim with a strength tier and a locator
//! - **PartyCandidate**: claims grouped by normalized name and scored
//! - **PartiesResult**: per-ship answers, conflicts, statuses and notes
//!
//! ## Usage
//!
//! ```rust
//! use serde_json::json;
//! use ship_parties::{Mode, PartiesEngine, PartiesRequest, Role, ShipIdentity};
//!
//! let identity = ShipIdentity::by_imo("9074729")?;
//! let request = PartiesRequest::new(identity)
//!     .with_mode(Mode::Strict)
//!     .with_ais_static(json!({ "registeredOwner": "Alpha Shipping" }));
//!
//! let report = PartiesEngine::new().resolve(&request)?;
//! let owner = report.result.party(Role::RegisteredOwner).map(|a| a.name.as_str());
//! assert_eq!(owner, Some("Alpha Shipping"));
//! # Ok::<(), ship_parties::PartiesError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod error;
pub mod evidence;
pub mod identity;
pub mod role;
pub mod tier;

// Resolution pipeline
pub mod contacts;
pub mod frame;
pub mod normalize;
pub mod pool;
pub mod resolver;
pub mod validate;

// Collaborators and orchestration
pub mod cancel;
pub mod config;
pub mod engine;
pub mod inference;
pub mod legacy;
pub mod request;
pub mod retrieval;

// Optional: HTTP transport
#[cfg(feature = "transport-http")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use cancel::{CancelOnDrop, CancelToken};
pub use config::EngineConfig;
pub use contacts::{Contact, ContactKind, DomainAllowList};
pub use engine::PartiesEngine;
pub use error::{
    AiInferenceError, ConfigError, EngineResult, PartiesError, RetrievalError, SchemaViolation,
    ValidationError,
};
pub use evidence::{EvidenceItem, EvidenceSource};
pub use frame::{AiStatus, PartiesReport, PartiesResult, PartyAnswer, PartyStatus, RetrievalStatus};
pub use identity::ShipIdentity;
pub use inference::{AiCollaborator, AiRequest, CachedAiCollaborator, Mode};
pub use legacy::LegacyPartiesView;
pub use pool::{CandidatePool, PartyCandidate, PoolSet};
pub use request::{PartiesQuery, PartiesRequest, ResponseVersion};
pub use resolver::Resolution;
pub use retrieval::{
    FanOutRetriever, InMemoryTtlCache, PublicSnippet, PublicSource, RetrievalCollaborator,
    RetrievalOptions, RetrievalOutcome, TtlCache,
};
pub use role::Role;
pub use tier::{Confidence, Strength};
