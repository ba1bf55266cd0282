//! Ordered trust tiers.
//!
//! `Confidence` is the declared or derived trust in a claim; `Strength`
//! describes how directly an evidence locator supports that claim.
//! Both are totally ordered so that merging can take maxima and candidate
//! scores compare lexicographically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Confidence tier (`high > medium > low`).
///
/// Variants are declared in ascending order so the derived `Ord` matches
/// the tier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Weakly supported.
    Low,
    /// Default for structured tracking data.
    Medium,
    /// Declared high by an authoritative source.
    High,
}

impl Confidence {
    /// Numeric rank used in candidate scores (0 = low).
    #[must_use]
    pub const fn rank(self) -> u32 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" | "med" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ValidationError::UnknownTier {
                kind: "confidence".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Evidence strength tier (`strong > medium > weak > none`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    /// No citable locator (e.g. an uncited AI guess).
    None,
    /// Scraped or free-text source.
    Weak,
    /// Structured but unofficial field (e.g. AIS static data).
    Medium,
    /// Structured registry field.
    Strong,
}

impl Strength {
    /// Numeric rank used in candidate scores (0 = none).
    #[must_use]
    pub const fn rank(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Weak => 1,
            Self::Medium => 2,
            Self::Strong => 3,
        }
    }

    /// Returns true if the evidence is citable at all.
    #[must_use]
    pub const fn is_citable(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strength {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong" => Ok(Self::Strong),
            "medium" | "med" => Ok(Self::Medium),
            "weak" => Ok(Self::Weak),
            "none" => Ok(Self::None),
            _ => Err(ValidationError::UnknownTier {
                kind: "strength".to_string(),
                value: s.to_string(),
            }),
        }
    }
}
