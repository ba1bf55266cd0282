//! Error types for the ship parties engine.
//!
//! Errors are strongly typed with thiserror and grouped by how they
//! propagate: validation problems drop a single item (or reject a request
//! with no identity), retrieval and AI failures are downgraded to status
//! flags, and schema violations are defects that must surface loudly.

use thiserror::Error;

use crate::role::Role;

/// Validation errors raised at the request and normalizer boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least one of imo, mmsi, name or callsign is required")]
    MissingIdentity,

    #[error("Invalid {field} '{value}'")]
    InvalidIdentifier {
        field: String,
        value: String,
    },

    #[error("Malformed evidence at {locator}: {reason}")]
    MalformedEvidence {
        locator: String,
        reason: String,
    },

    #[error("Unknown role '{value}'")]
    UnknownRole {
        value: String,
    },

    #[error("Unknown {kind} '{value}'")]
    UnknownTier {
        kind: String,
        value: String,
    },

    #[error("Unknown mode '{value}' (expected strict, balanced or aggressive)")]
    InvalidMode {
        value: String,
    },

    #[error("Unsupported response version '{value}'")]
    UnsupportedVersion {
        value: String,
    },

    #[error("Field '{field}' is not valid JSON: {reason}")]
    MalformedJson {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },
}

/// Failure of a single public source during retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error("Source '{source_id}' timed out after {timeout_ms}ms")]
    Timeout {
        source_id: String,
        timeout_ms: u64,
    },

    #[error("Source '{source_id}' failed: {message}")]
    Source {
        source_id: String,
        message: String,
    },

    #[error("URL '{url}' is not on the official allow-list")]
    Disallowed {
        url: String,
    },
}

/// Failure of the AI inference step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiInferenceError {
    #[error("AI unavailable: no collaborator configured")]
    Unavailable,

    #[error("AI inference timed out after {timeout_ms}ms")]
    Timeout {
        timeout_ms: u64,
    },

    #[error("AI collaborator failed: {message}")]
    Collaborator {
        message: String,
    },

    #[error("AI output could not be parsed: {reason}")]
    Unparsable {
        reason: String,
    },

    #[error("AI inference was cancelled")]
    Cancelled,
}

/// Output invariant violated by an assembled result.
///
/// These are programming defects, never user-facing conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("{role}: answer has no evidence")]
    AnswerWithoutEvidence {
        role: Role,
    },

    #[error("{role}: confirmed answer is supported only by no-evidence items")]
    ConfirmedWithoutSupport {
        role: Role,
    },

    #[error("{role}: unverified AI answer carries evidence with strength above none")]
    UnverifiedWithSupport {
        role: Role,
    },

    #[error("{role}: candidate list of length {len} (must be at least 2)")]
    CandidateListTooShort {
        role: Role,
        len: usize,
    },

    #[error("{role}: answer confirmed while candidates are in conflict")]
    ConfirmedDuringConflict {
        role: Role,
    },

    #[error("{role}: candidates are not sorted by descending score")]
    CandidatesUnsorted {
        role: Role,
    },

    #[error("{role}: candidate '{name}' has no evidence")]
    CandidateWithoutEvidence {
        role: Role,
        name: String,
    },

    #[error("contact from '{path}' is not backed by strong evidence")]
    ContactWithoutStrongEvidence {
        path: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config value for '{field}': {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum PartiesError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request was cancelled")]
    Cancelled,
}

impl PartiesError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a schema violation.
    #[must_use]
    pub const fn is_schema_violation(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Returns true if the request was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status code equivalent for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Cancelled => 503,
            Self::Schema(_) | Self::Config(_) => 500,
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, PartiesError>;
