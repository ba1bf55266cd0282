use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::frame::{AiStatus, RetrievalStatus};
use crate::resolver::Resolution;
use crate::role::Role;

/// Request-time policy controlling how eagerly AI fills gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Never request AI.
    Strict,
    /// Request AI only for roles with no deterministic evidence, and only
    /// when public evidence exists to ground the request.
    Balanced,
    /// Request AI for every unresolved role, conflicts included.
    Aggressive,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Aggressive
    }
}

impl Mode {
    /// Returns a short stable identifier suitable for logging/debugging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(ValidationError::InvalidMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Per-role resolution state.
///
/// `Empty`/`Conflicted` move to `AwaitingAi` when the gate requests AI;
/// `AwaitingAi` settles back through the conflict resolver into
/// `Resolved`, `Conflicted` or `Empty`. `Resolved` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleState {
    /// No evidence at all.
    Empty,
    /// Exactly one candidate group.
    Resolved,
    /// Two or more candidate groups.
    Conflicted,
    /// AI was requested and has not been folded in yet.
    AwaitingAi,
}

impl RoleState {
    /// State after a pass of the conflict resolver.
    #[must_use]
    pub const fn settle(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Answered(_) => Self::Resolved,
            Resolution::Conflict(_) => Self::Conflicted,
            Resolution::Empty => Self::Empty,
        }
    }

    /// State once AI has been requested for the role.
    ///
    /// A resolved role never awaits AI.
    #[must_use]
    pub const fn request_ai(self) -> Self {
        match self {
            Self::Resolved => Self::Resolved,
            Self::Empty | Self::Conflicted | Self::AwaitingAi => Self::AwaitingAi,
        }
    }

    /// Returns true if no single answer exists yet.
    #[must_use]
    pub const fn is_unresolved(self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

/// Decision of the AI gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiPlan {
    /// Ask AI about these roles (canonical order, never empty).
    Request(Vec<Role>),
    /// Do not ask; report `status` with a human-readable reason.
    Skip {
        /// `skipped` or `not_requested`.
        status: AiStatus,
        /// Why the gate declined.
        reason: String,
    },
}

impl AiPlan {
    /// Roles to request, empty when skipping.
    #[must_use]
    pub fn requested_roles(&self) -> &[Role] {
        match self {
            Self::Request(roles) => roles,
            Self::Skip { .. } => &[],
        }
    }
}

/// Decides whether AI should be requested, and for which roles.
///
/// Confirmed deterministic answers are final and never revisited.
#[must_use]
pub fn plan_ai(
    mode: Mode,
    retrieval_status: RetrievalStatus,
    states: &BTreeMap<Role, RoleState>,
) -> AiPlan {
    let roles_where = |pred: fn(RoleState) -> bool| -> Vec<Role> {
        states
            .iter()
            .filter(|(_, state)| pred(**state))
            .map(|(role, _)| *role)
            .collect()
    };

    match mode {
        Mode::Strict => AiPlan::Skip {
            status: AiStatus::Skipped,
            reason: "strict mode never requests AI".to_string(),
        },
        Mode::Balanced => {
            let empty = roles_where(|s| s == RoleState::Empty);
            if empty.is_empty() {
                AiPlan::Skip {
                    status: AiStatus::NotRequested,
                    reason: "every role has deterministic evidence".to_string(),
                }
            } else if retrieval_status != RetrievalStatus::Ok {
                AiPlan::Skip {
                    status: AiStatus::NotRequested,
                    reason: "no public evidence to ground an AI request".to_string(),
                }
            } else {
                AiPlan::Request(empty)
            }
        }
        Mode::Aggressive => {
            let unresolved = roles_where(RoleState::is_unresolved);
            if unresolved.is_empty() {
                AiPlan::Skip {
                    status: AiStatus::NotRequested,
                    reason: "every role resolved from deterministic evidence".to_string(),
                }
            } else {
                AiPlan::Request(unresolved)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(pairs: &[(Role, RoleState)]) -> BTreeMap<Role, RoleState> {
        let mut map: BTreeMap<Role, RoleState> =
            Role::ALL.iter().map(|&r| (r, RoleState::Resolved)).collect();
        for (role, state) in pairs {
            map.insert(*role, *state);
        }
        map
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Balanced".parse::<Mode>().unwrap(), Mode::Balanced);
        assert!(matches!(
            "yolo".parse::<Mode>(),
            Err(ValidationError::InvalidMode { .. })
        ));
        assert_eq!(Mode::default(), Mode::Aggressive);
    }

    #[test]
    fn test_strict_always_skips() {
        let plan = plan_ai(
            Mode::Strict,
            RetrievalStatus::Ok,
            &states(&[(Role::Operator, RoleState::Empty)]),
        );
        assert!(matches!(plan, AiPlan::Skip { status: AiStatus::Skipped, .. }));
        assert!(plan.requested_roles().is_empty());
    }

    #[test]
    fn test_balanced_requires_retrieval() {
        let s = states(&[(Role::Operator, RoleState::Empty)]);

        let plan = plan_ai(Mode::Balanced, RetrievalStatus::Empty, &s);
        assert!(matches!(plan, AiPlan::Skip { status: AiStatus::NotRequested, .. }));

        let plan = plan_ai(Mode::Balanced, RetrievalStatus::Ok, &s);
        assert_eq!(plan, AiPlan::Request(vec![Role::Operator]));
    }

    #[test]
    fn test_balanced_ignores_conflicts() {
        let s = states(&[(Role::Operator, RoleState::Conflicted)]);
        let plan = plan_ai(Mode::Balanced, RetrievalStatus::Ok, &s);
        assert!(matches!(plan, AiPlan::Skip { status: AiStatus::NotRequested, .. }));
    }

    #[test]
    fn test_aggressive_includes_conflicts_without_retrieval() {
        let s = states(&[
            (Role::RegisteredOwner, RoleState::Conflicted),
            (Role::Manager, RoleState::Empty),
        ]);
        let plan = plan_ai(Mode::Aggressive, RetrievalStatus::Empty, &s);
        assert_eq!(plan, AiPlan::Request(vec![Role::RegisteredOwner, Role::Manager]));
    }

    #[test]
    fn test_aggressive_leaves_resolved_roles_alone() {
        let plan = plan_ai(Mode::Aggressive, RetrievalStatus::Ok, &states(&[]));
        assert!(matches!(plan, AiPlan::Skip { status: AiStatus::NotRequested, .. }));
    }

    #[test]
    fn test_state_machine() {
        assert_eq!(RoleState::Empty.request_ai(), RoleState::AwaitingAi);
        assert_eq!(RoleState::Conflicted.request_ai(), RoleState::AwaitingAi);
        assert_eq!(RoleState::Resolved.request_ai(), RoleState::Resolved);
        assert_eq!(RoleState::settle(&Resolution::Empty), RoleState::Empty);
    }
}
