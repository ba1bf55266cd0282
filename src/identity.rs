//! Ship identity.
//!
//! A request must identify the vessel by at least one of IMO number, MMSI,
//! name or callsign. Identifiers are normalized on construction so that the
//! same ship always produces the same cache key.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a free-text ship name.
pub const MAX_SHIP_NAME_LEN: usize = 128;

/// Normalized vessel identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipIdentity {
    /// Seven-digit IMO number (without the `IMO` prefix).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imo: Option<String>,

    /// Nine-digit MMSI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmsi: Option<String>,

    /// Vessel name (trimmed, original casing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Radio callsign (upper-cased).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validates the IMO check digit: the first six digits weighted 7..2,
/// summed, modulo 10 must equal the seventh digit.
fn imo_checksum_ok(digits: &[u32]) -> bool {
    if digits.len() != 7 {
        return false;
    }
    let sum: u32 = digits[..6]
        .iter()
        .zip((2..=7).rev())
        .map(|(d, w)| d * w)
        .sum();
    sum % 10 == digits[6]
}

fn normalize_imo(raw: &str) -> Result<String, ValidationError> {
    let invalid = || ValidationError::InvalidIdentifier {
        field: "imo".to_string(),
        value: raw.to_string(),
    };

    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("IMO")
        .or_else(|| trimmed.strip_prefix("imo"))
        .unwrap_or(trimmed)
        .trim_start_matches([' ', ':', '-']);

    let digits: Vec<u32> = stripped.chars().map(|c| c.to_digit(10)).collect::<Option<_>>().ok_or_else(invalid)?;
    if !imo_checksum_ok(&digits) {
        return Err(invalid());
    }
    Ok(stripped.to_string())
}

fn normalize_mmsi(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.len() != 9 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidIdentifier {
            field: "mmsi".to_string(),
            value: raw.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

impl ShipIdentity {
    /// Builds a normalized identity.
    ///
    /// # Errors
    ///
    /// - `ValidationError::MissingIdentity` if every field is absent or blank.
    /// - `ValidationError::InvalidIdentifier` for a malformed IMO/MMSI.
    /// - `ValidationError::FieldTooLong` for an oversized name.
    pub fn new(
        imo: Option<&str>,
        mmsi: Option<&str>,
        name: Option<&str>,
        callsign: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let imo = non_blank(imo).map(normalize_imo).transpose()?;
        let mmsi = non_blank(mmsi).map(normalize_mmsi).transpose()?;

        let name = non_blank(name).map(str::to_string);
        if let Some(n) = &name {
            if n.chars().count() > MAX_SHIP_NAME_LEN {
                return Err(ValidationError::FieldTooLong {
                    field: "name".to_string(),
                    max_length: MAX_SHIP_NAME_LEN,
                });
            }
        }

        let callsign = non_blank(callsign).map(str::to_ascii_uppercase);

        let identity = Self {
            imo,
            mmsi,
            name,
            callsign,
        };
        if identity.is_empty() {
            return Err(ValidationError::MissingIdentity);
        }
        Ok(identity)
    }

    /// Identity by IMO number only.
    pub fn by_imo(imo: &str) -> Result<Self, ValidationError> {
        Self::new(Some(imo), None, None, None)
    }

    /// Identity by name only.
    pub fn by_name(name: &str) -> Result<Self, ValidationError> {
        Self::new(None, None, Some(name), None)
    }

    /// Returns true if no identifying field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.imo.is_none() && self.mmsi.is_none() && self.name.is_none() && self.callsign.is_none()
    }

    /// Stable cache key for this identity (blake3 hex digest).
    ///
    /// Names are compared case-insensitively.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in [
            self.imo.as_deref(),
            self.mmsi.as_deref(),
            self.name.as_deref().map(str::to_lowercase).as_deref(),
            self.callsign.as_deref(),
        ] {
            hasher.update(part.unwrap_or("").as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Short label for logs, e.g. `IMO 9074729`.
    #[must_use]
    pub fn label(&self) -> String {
        if let Some(imo) = &self.imo {
            format!("IMO {imo}")
        } else if let Some(mmsi) = &self.mmsi {
            format!("MMSI {mmsi}")
        } else if let Some(name) = &self.name {
            name.clone()
        } else {
            self.callsign.clone().unwrap_or_default()
        }
    }
}
