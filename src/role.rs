//! Party roles tracked per vessel.
//!
//! Roles are a fixed, closed set. Resolution never mixes evidence across
//! roles, so every pool, answer and candidate list is keyed by `Role`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Ownership or management relationship between a party and a vessel.
///
/// Variant order is the canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Registered (legal) owner.
    RegisteredOwner,
    /// Ultimate beneficial owner.
    BeneficialOwner,
    /// Commercial operator.
    Operator,
    /// Technical / ISM manager.
    Manager,
    /// Bareboat (demise) charterer.
    BareboatCharterer,
}

impl Role {
    /// Every role, in canonical order.
    pub const ALL: [Role; 5] = [
        Role::RegisteredOwner,
        Role::BeneficialOwner,
        Role::Operator,
        Role::Manager,
        Role::BareboatCharterer,
    ];

    /// Wire name used in JSON payloads and evidence locators.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RegisteredOwner => "registeredOwner",
            Self::BeneficialOwner => "beneficialOwner",
            Self::Operator => "operator",
            Self::Manager => "manager",
            Self::BareboatCharterer => "bareboatCharterer",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RegisteredOwner => "registered owner",
            Self::BeneficialOwner => "beneficial owner",
            Self::Operator => "operator",
            Self::Manager => "manager",
            Self::BareboatCharterer => "bareboat charterer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    /// Accepts the wire name, its snake_case spelling and common aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "registeredowner" | "owner" | "regowner" => Ok(Self::RegisteredOwner),
            "beneficialowner" | "ubo" => Ok(Self::BeneficialOwner),
            "operator" | "commercialoperator" => Ok(Self::Operator),
            "manager" | "ismmanager" | "technicalmanager" | "shipmanager" => Ok(Self::Manager),
            "bareboatcharterer" | "bareboat" | "charterer" => Ok(Self::BareboatCharterer),
            _ => Err(ValidationError::UnknownRole {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("registered_owner".parse::<Role>().unwrap(), Role::RegisteredOwner);
        assert_eq!("Owner".parse::<Role>().unwrap(), Role::RegisteredOwner);
        assert_eq!("ism_manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("bareboat".parse::<Role>().unwrap(), Role::BareboatCharterer);
    }

    #[test]
    fn test_unknown_role() {
        let err = "flag_state".parse::<Role>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownRole { .. }));
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_string(&Role::BareboatCharterer).unwrap();
        assert_eq!(json, "\"bareboatCharterer\"");
    }

    #[test]
    fn test_canonical_order() {
        let mut roles = vec![Role::Manager, Role::RegisteredOwner, Role::Operator];
        roles.sort();
        assert_eq!(roles, vec![Role::RegisteredOwner, Role::Operator, Role::Manager]);
    }
}
