//! Evidence items and their provenance.
//!
//! Every party answer must be traceable to the evidence that supports it.
//! Evidence items are immutable once created: fields are private and the
//! only way to change an item is to build a new one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tier::Strength;

/// Where an evidence item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    /// Structured vessel-tracking static data.
    AisStatic,
    /// Records supplied by the caller.
    External,
    /// Generative-AI inference.
    Ai,
}

impl EvidenceSource {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AisStatic => "ais_static",
            Self::External => "external",
            Self::Ai => "ai",
        }
    }

    /// Returns true for sources that do not involve AI inference.
    #[must_use]
    pub const fn is_deterministic(self) -> bool {
        !matches!(self, Self::Ai)
    }
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic, sourced claim about a role's value.
///
/// `path` is a locator into the originating payload, kept for audit only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceItem {
    source: EvidenceSource,
    path: String,
    strength: Strength,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl EvidenceItem {
    /// Creates an evidence item.
    #[must_use]
    pub fn new(source: EvidenceSource, path: impl Into<String>, strength: Strength) -> Self {
        Self {
            source,
            path: path.into(),
            strength,
            note: None,
        }
    }

    /// Attaches a free-text note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Originating source.
    #[must_use]
    pub const fn source(&self) -> EvidenceSource {
        self.source
    }

    /// Locator into the originating payload.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// How directly the locator supports the claim.
    #[must_use]
    pub const fn strength(&self) -> Strength {
        self.strength
    }

    /// Optional note.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}
