//! Request surface.
//!
//! `PartiesQuery` is the raw query-string shape of
//! `GET /api/ship/parties`; `PartiesRequest` is its validated form. A
//! missing or malformed identity rejects the request; malformed evidence
//! parameters only drop that parameter and are reported in the result.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ValidationError;
use crate::identity::ShipIdentity;
use crate::inference::Mode;

/// Response shape selected by `v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResponseVersion {
    /// Legacy flat shape.
    V1,
    /// Full report with candidates and public evidence.
    #[default]
    V2,
}

impl ResponseVersion {
    /// Parses the `v` parameter; absent means `V2`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnsupportedVersion` for anything other
    /// than `1` or `2`.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw.map(str::trim) {
            None | Some("" | "2") => Ok(Self::V2),
            Some("1") => Ok(Self::V1),
            Some(other) => Err(ValidationError::UnsupportedVersion {
                value: other.to_string(),
            }),
        }
    }
}

/// Raw query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartiesQuery {
    /// IMO number.
    pub imo: Option<String>,
    /// MMSI.
    pub mmsi: Option<String>,
    /// Ship name.
    pub name: Option<String>,
    /// Radio callsign.
    pub callsign: Option<String>,
    /// JSON object of role to value.
    pub ais_static: Option<String>,
    /// JSON array of external evidence claims.
    pub external: Option<String>,
    /// `1` bypasses memoized AI answers.
    pub force_ai: Option<String>,
    /// Response version (`1` or `2`).
    pub v: Option<String>,
    /// `strict`, `balanced` or `aggressive`.
    pub mode: Option<String>,
}

fn flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

fn parse_json_param(field: &str, raw: Option<&str>, errors: &mut Vec<ValidationError>) -> JsonValue {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => JsonValue::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            let err = ValidationError::MalformedJson {
                field: field.to_string(),
                reason: e.to_string(),
            };
            tracing::warn!(error = %err, "ignoring malformed request parameter");
            errors.push(err);
            JsonValue::Null
        }),
    }
}

/// A validated resolution request.
#[derive(Debug, Clone, PartialEq)]
pub struct PartiesRequest {
    /// Normalized ship identity.
    pub identity: ShipIdentity,
    /// AIS static fields (`null` when absent).
    pub ais_static: JsonValue,
    /// External evidence claims (`null` when absent).
    pub external: JsonValue,
    /// Bypass memoized AI answers.
    pub force_ai: bool,
    /// Response shape.
    pub version: ResponseVersion,
    /// AI policy.
    pub mode: Mode,
    /// Parameter-level problems that did not reject the request.
    pub input_errors: Vec<ValidationError>,
}

impl PartiesRequest {
    /// Request for `identity` with no evidence and the default mode.
    #[must_use]
    pub fn new(identity: ShipIdentity) -> Self {
        Self {
            identity,
            ais_static: JsonValue::Null,
            external: JsonValue::Null,
            force_ai: false,
            version: ResponseVersion::default(),
            mode: Mode::default(),
            input_errors: Vec::new(),
        }
    }

    /// Sets the AIS static object.
    #[must_use]
    pub fn with_ais_static(mut self, ais_static: JsonValue) -> Self {
        self.ais_static = ais_static;
        self
    }

    /// Sets the external evidence array.
    #[must_use]
    pub fn with_external(mut self, external: JsonValue) -> Self {
        self.external = external;
        self
    }

    /// Sets the AI policy.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Requests a fresh AI answer.
    #[must_use]
    pub fn with_force_ai(mut self, force_ai: bool) -> Self {
        self.force_ai = force_ai;
        self
    }

    /// Validates a raw query.
    ///
    /// `default_mode` applies when `mode` is absent.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for a missing or malformed identity, an
    /// unknown `mode`, or an unsupported `v`.
    pub fn from_query(query: &PartiesQuery, default_mode: Mode) -> Result<Self, ValidationError> {
        let identity = ShipIdentity::new(
            query.imo.as_deref(),
            query.mmsi.as_deref(),
            query.name.as_deref(),
            query.callsign.as_deref(),
        )?;
        let version = ResponseVersion::parse(query.v.as_deref())?;
        let mode = match query.mode.as_deref().map(str::trim) {
            None | Some("") => default_mode,
            Some(m) => m.parse()?,
        };

        let mut input_errors = Vec::new();
        let ais_static = parse_json_param("ais_static", query.ais_static.as_deref(), &mut input_errors);
        let external = parse_json_param("external", query.external.as_deref(), &mut input_errors);

        Ok(Self {
            identity,
            ais_static,
            external,
            force_ai: flag(query.force_ai.as_deref()),
            version,
            mode,
            input_errors,
        })
    }
}
