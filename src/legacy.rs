//! Version 1 response shape.
//!
//! A flat view kept for older clients: names only, and only for confirmed
//! answers. Unverified AI answers are left out with a note since this
//! shape has no way to mark them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::frame::{AiStatus, PartiesResult};
use crate::identity::ShipIdentity;
use crate::role::Role;

/// Flat `v=1` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPartiesView {
    /// Normalized ship identity.
    pub identity: ShipIdentity,
    /// Confirmed registered owner.
    pub owner: Option<String>,
    /// Confirmed operator.
    pub operator: Option<String>,
    /// Confirmed manager.
    pub manager: Option<String>,
    /// Confirmed name per role.
    pub parties: BTreeMap<Role, Option<String>>,
    /// AI step status.
    pub ai_status: AiStatus,
    /// Notes, including omitted unverified answers.
    pub notes: Vec<String>,
}

impl LegacyPartiesView {
    /// Flattens a result.
    #[must_use]
    pub fn from_result(result: &PartiesResult) -> Self {
        let mut notes = result.notes.clone();
        let mut parties = BTreeMap::new();

        for role in Role::ALL {
            let name = match result.party(role) {
                Some(answer) if answer.is_confirmed() => Some(answer.name.clone()),
                Some(answer) => {
                    notes.push(format!(
                        "{}: unverified AI answer '{}' omitted",
                        role.label(),
                        answer.name
                    ));
                    None
                }
                None => None,
            };
            parties.insert(role, name);
        }

        let confirmed = |role: Role| parties.get(&role).cloned().flatten();
        Self {
            identity: result.identity.clone(),
            owner: confirmed(Role::RegisteredOwner),
            operator: confirmed(Role::Operator),
            manager: confirmed(Role::Manager),
            parties,
            ai_status: result.ai_status,
            notes,
        }
    }
}

impl From<&PartiesResult> for LegacyPartiesView {
    fn from(result: &PartiesResult) -> Self {
        Self::from_result(result)
    }
}
