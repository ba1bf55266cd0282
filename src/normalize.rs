//! Evidence normalizer.
//!
//! Callers send loosely shaped JSON: an AIS static object mapping role to
//! value, and an array of external claims. This module parses both into a
//! strict `RawClaim` union at the boundary and turns each claim into a
//! `NormalizedClaim`. A malformed item becomes a `ValidationError` and is
//! dropped; it never aborts the rest of the request.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::ValidationError;
use crate::evidence::{EvidenceItem, EvidenceSource};
use crate::role::Role;
use crate::tier::{Confidence, Strength};

/// Maximum length of a party name.
pub const MAX_NAME_LEN: usize = 512;

/// Maximum length of an evidence locator.
pub const MAX_PATH_LEN: usize = 2048;

/// Maximum length of an evidence note.
pub const MAX_NOTE_LEN: usize = 4096;

/// Maximum number of external claims accepted per request.
pub const MAX_EXTERNAL_CLAIMS: usize = 256;

/// Implicit confidence of AIS static fields.
pub const AIS_CONFIDENCE: Confidence = Confidence::Medium;

/// Implicit strength of AIS static fields.
pub const AIS_STRENGTH: Strength = Strength::Medium;

/// Default strength of external claims that do not declare one.
pub const EXTERNAL_DEFAULT_STRENGTH: Strength = Strength::Weak;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn edge_punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{P}\s]+|[\p{P}\s]+$").expect("static regex"))
}

/// Canonical grouping key for a party name.
///
/// Case-folds, collapses internal whitespace and strips leading/trailing
/// punctuation. `"  ALPHA   Shipping Ltd. "` and `"alpha shipping ltd"`
/// share a key.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let stripped = edge_punctuation_re().replace_all(raw, "");
    let collapsed = whitespace_re().replace_all(&stripped, " ");
    collapsed.to_lowercase()
}

/// A claim after normalization, ready for pooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedClaim {
    /// Role the claim is about.
    pub role: Role,
    /// Original name, trimmed, for display.
    pub display_name: String,
    /// Grouping key (see [`normalize_name`]).
    pub normalized_key: String,
    /// Declared or implicit confidence.
    pub confidence: Confidence,
    /// Evidence backing the claim.
    pub evidence: EvidenceItem,
}

/// External claim as sent by the caller.
///
/// `field` is accepted as an alias of `role`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalClaim {
    /// Role name or alias.
    #[serde(alias = "field")]
    pub role: String,
    /// Claimed party name.
    pub value: String,
    /// Declared confidence (defaults to medium).
    #[serde(default)]
    pub confidence: Option<String>,
    /// Locator into the caller's record (defaults to `external[i]`).
    #[serde(default)]
    pub path: Option<String>,
    /// Declared strength (defaults to weak).
    #[serde(default)]
    pub strength: Option<String>,
    /// Free-text note.
    #[serde(default)]
    pub note: Option<String>,
}

/// Strict union of every raw claim shape the normalizer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawClaim {
    /// One AIS static field.
    AisStatic {
        /// Role key as sent.
        role: String,
        /// Field value.
        value: String,
    },
    /// One external record claim with its array index.
    External {
        /// Position in the `external` array.
        index: usize,
        /// Parsed claim.
        claim: ExternalClaim,
    },
}

/// Result of normalizing a batch: accepted claims plus dropped-item errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOutcome {
    /// Claims that passed validation, in input order.
    pub claims: Vec<NormalizedClaim>,
    /// One error per dropped item.
    pub errors: Vec<ValidationError>,
}

impl NormalizeOutcome {
    /// Appends another outcome, preserving order.
    pub fn extend(&mut self, other: NormalizeOutcome) {
        self.claims.extend(other.claims);
        self.errors.extend(other.errors);
    }

    fn push(&mut self, result: Result<NormalizedClaim, ValidationError>) {
        match result {
            Ok(claim) => self.claims.push(claim),
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed evidence item");
                self.errors.push(err);
            }
        }
    }
}

fn check_len(field: &str, value: &str, max_length: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max_length {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max_length,
        });
    }
    Ok(())
}

fn malformed(locator: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::MalformedEvidence {
        locator: locator.to_string(),
        reason: reason.into(),
    }
}

fn name_parts(locator: &str, raw: &str) -> Result<(String, String), ValidationError> {
    let display = raw.trim();
    if display.is_empty() {
        return Err(malformed(locator, "value is empty"));
    }
    check_len(&format!("{locator}.value"), display, MAX_NAME_LEN)?;
    let key = normalize_name(display);
    if key.is_empty() {
        return Err(malformed(locator, "value has no name content"));
    }
    Ok((display.to_string(), key))
}

/// Normalizes one raw claim.
///
/// # Errors
///
/// Returns a `ValidationError` describing why the item must be dropped.
pub fn normalize_claim(raw: RawClaim) -> Result<NormalizedClaim, ValidationError> {
    match raw {
        RawClaim::AisStatic { role, value } => {
            let role: Role = role.parse()?;
            let path = format!("ais_static.{role}");
            let (display_name, normalized_key) = name_parts(&path, &value)?;
            Ok(NormalizedClaim {
                role,
                display_name,
                normalized_key,
                confidence: AIS_CONFIDENCE,
                evidence: EvidenceItem::new(EvidenceSource::AisStatic, path, AIS_STRENGTH),
            })
        }
        RawClaim::External { index, claim } => {
            let locator = format!("external[{index}]");
            let role: Role = claim.role.parse()?;
            let (display_name, normalized_key) = name_parts(&locator, &claim.value)?;

            let confidence = match claim.confidence.as_deref().map(str::trim) {
                None | Some("") => Confidence::default(),
                Some(c) => c.parse()?,
            };
            let strength = match claim.strength.as_deref().map(str::trim) {
                None | Some("") => EXTERNAL_DEFAULT_STRENGTH,
                Some(s) => s.parse()?,
            };

            let path = match claim.path.as_deref().map(str::trim) {
                None | Some("") => locator,
                Some(p) => {
                    check_len(&format!("{locator}.path"), p, MAX_PATH_LEN)?;
                    p.to_string()
                }
            };

            let mut evidence = EvidenceItem::new(EvidenceSource::External, path, strength);
            if let Some(note) = claim.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                check_len(&format!("external[{index}].note"), note, MAX_NOTE_LEN)?;
                evidence = evidence.with_note(note);
            }

            Ok(NormalizedClaim {
                role,
                display_name,
                normalized_key,
                confidence,
                evidence,
            })
        }
    }
}

/// Normalizes the AIS static object (`{ role: value }`).
///
/// Null and blank values mean "field not broadcast" and are skipped
/// without an error. Keys are visited in sorted order so the outcome does
/// not depend on JSON object ordering.
#[must_use]
pub fn normalize_ais_static(value: &JsonValue) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    let map = match value {
        JsonValue::Null => return outcome,
        JsonValue::Object(map) => map,
        _ => {
            outcome.push(Err(ValidationError::MalformedJson {
                field: "ais_static".to_string(),
                reason: "expected an object of role to value".to_string(),
            }));
            return outcome;
        }
    };

    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    for key in keys {
        let locator = format!("ais_static.{key}");
        match &map[key.as_str()] {
            JsonValue::Null => {}
            JsonValue::String(s) if s.trim().is_empty() => {}
            JsonValue::String(s) => outcome.push(normalize_claim(RawClaim::AisStatic {
                role: key.clone(),
                value: s.clone(),
            })),
            _ => outcome.push(Err(malformed(&locator, "expected a string value"))),
        }
    }

    outcome
}

/// Normalizes the external evidence array.
///
/// Claims beyond [`MAX_EXTERNAL_CLAIMS`] are dropped with one error.
#[must_use]
pub fn normalize_external(value: &JsonValue) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    let items = match value {
        JsonValue::Null => return outcome,
        JsonValue::Array(items) => items,
        _ => {
            outcome.push(Err(ValidationError::MalformedJson {
                field: "external".to_string(),
                reason: "expected an array of evidence claims".to_string(),
            }));
            return outcome;
        }
    };

    for (index, item) in items.iter().enumerate().take(MAX_EXTERNAL_CLAIMS) {
        let parsed = ExternalClaim::deserialize(item)
            .map_err(|e| malformed(&format!("external[{index}]"), e.to_string()))
            .and_then(|claim| normalize_claim(RawClaim::External { index, claim }));
        outcome.push(parsed);
    }

    if items.len() > MAX_EXTERNAL_CLAIMS {
        outcome.push(Err(ValidationError::FieldTooLong {
            field: "external".to_string(),
            max_length: MAX_EXTERNAL_CLAIMS,
        }));
    }

    outcome
}
