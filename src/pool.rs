//! Candidate pool builder.
//!
//! For each role, normalized claims are grouped by `normalized_key`. Each
//! group becomes one `PartyCandidate` whose confidence is the maximum of
//! its members and whose evidence is the members' evidence in first-seen
//! order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceItem;
use crate::normalize::NormalizedClaim;
use crate::role::Role;
use crate::tier::{Confidence, Strength};

/// Lexicographic ranking tuple for a candidate group.
///
/// Compared by confidence tier, then best strength tier, then number of
/// evidence items. Uncited (`none`) members only count when the group has
/// no cited member, so an uncited AI guess never lifts a group above what
/// its verifiable evidence earns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateScore {
    /// Highest confidence among counted members.
    pub confidence: Confidence,
    /// Highest strength among counted members.
    pub strength: Strength,
    /// Number of counted evidence items.
    pub evidence_count: usize,
}

impl CandidateScore {
    const COUNT_CAP: usize = 999;

    /// Flattens the tuple into a single number with the same ordering.
    #[must_use]
    pub fn value(&self) -> u32 {
        let count = u32::try_from(self.evidence_count.min(Self::COUNT_CAP)).unwrap_or(0);
        self.confidence.rank() * 10_000 + self.strength.rank() * 1_000 + count
    }
}

impl Ord for CandidateScore {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.confidence, self.strength, self.evidence_count).cmp(&(
            other.confidence,
            other.strength,
            other.evidence_count,
        ))
    }
}

impl PartialOrd for CandidateScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A grouped, scored claim for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyCandidate {
    /// Display name (first-seen spelling).
    pub name: String,
    /// Grouping key.
    #[serde(rename = "normalizedKey")]
    pub normalized_key: String,
    /// Maximum confidence among members.
    pub confidence: Confidence,
    /// Member evidence in first-seen order.
    pub evidence: Vec<EvidenceItem>,
    /// Flattened [`CandidateScore`].
    pub score: u32,
}

impl PartyCandidate {
    /// Returns true if every evidence item is uncited.
    #[must_use]
    pub fn is_unverified(&self) -> bool {
        self.evidence.iter().all(|e| !e.strength().is_citable())
    }
}

#[derive(Debug, Clone)]
struct Member {
    confidence: Confidence,
    evidence: EvidenceItem,
}

#[derive(Debug, Clone)]
struct Group {
    name: String,
    normalized_key: String,
    members: Vec<Member>,
}

impl Group {
    fn score(&self) -> CandidateScore {
        let cited: Vec<&Member> = self
            .members
            .iter()
            .filter(|m| m.evidence.strength().is_citable())
            .collect();
        let counted: Vec<&Member> = if cited.is_empty() {
            self.members.iter().collect()
        } else {
            cited
        };

        CandidateScore {
            confidence: counted
                .iter()
                .map(|m| m.confidence)
                .max()
                .unwrap_or(Confidence::Low),
            strength: counted
                .iter()
                .map(|m| m.evidence.strength())
                .max()
                .unwrap_or(Strength::None),
            evidence_count: counted.len(),
        }
    }

    fn to_candidate(&self) -> PartyCandidate {
        PartyCandidate {
            name: self.name.clone(),
            normalized_key: self.normalized_key.clone(),
            confidence: self
                .members
                .iter()
                .map(|m| m.confidence)
                .max()
                .unwrap_or(Confidence::Low),
            evidence: self.members.iter().map(|m| m.evidence.clone()).collect(),
            score: self.score().value(),
        }
    }
}

/// Candidate groups for a single role.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    role: Role,
    groups: Vec<Group>,
    index: HashMap<String, usize>,
}

impl CandidatePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Role this pool belongs to.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Adds a claim, joining an existing group when the key matches.
    ///
    /// Claims for a different role are ignored.
    pub fn add(&mut self, claim: NormalizedClaim) {
        if claim.role != self.role {
            tracing::debug!(pool = %self.role, claim = %claim.role, "ignoring claim for another role");
            return;
        }

        let member = Member {
            confidence: claim.confidence,
            evidence: claim.evidence,
        };

        if let Some(&idx) = self.index.get(&claim.normalized_key) {
            self.groups[idx].members.push(member);
            return;
        }

        self.index.insert(claim.normalized_key.clone(), self.groups.len());
        self.groups.push(Group {
            name: claim.display_name,
            normalized_key: claim.normalized_key,
            members: vec![member],
        });
    }

    /// Number of distinct candidate groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no claim has been pooled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Candidates in first-seen order.
    #[must_use]
    pub fn candidates(&self) -> Vec<PartyCandidate> {
        self.groups.iter().map(Group::to_candidate).collect()
    }

    /// All pooled evidence in first-seen group order.
    pub fn evidence(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.groups
            .iter()
            .flat_map(|g| g.members.iter().map(|m| &m.evidence))
    }
}

/// One candidate pool per role.
#[derive(Debug, Clone)]
pub struct PoolSet {
    pools: BTreeMap<Role, CandidatePool>,
}

impl Default for PoolSet {
    fn default() -> Self {
        Self {
            pools: Role::ALL
                .iter()
                .map(|&role| (role, CandidatePool::new(role)))
                .collect(),
        }
    }
}

impl PoolSet {
    /// Creates a set of empty pools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds pools from claims in the given order.
    #[must_use]
    pub fn from_claims(claims: impl IntoIterator<Item = NormalizedClaim>) -> Self {
        let mut set = Self::new();
        for claim in claims {
            set.add(claim);
        }
        set
    }

    /// Routes a claim to its role's pool.
    pub fn add(&mut self, claim: NormalizedClaim) {
        self.pools
            .entry(claim.role)
            .or_insert_with(|| CandidatePool::new(claim.role))
            .add(claim);
    }

    /// Pool for a role.
    #[must_use]
    pub fn pool(&self, role: Role) -> Option<&CandidatePool> {
        self.pools.get(&role)
    }

    /// Iterates pools in canonical role order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &CandidatePool)> {
        self.pools.iter().map(|(role, pool)| (*role, pool))
    }

    /// Roles whose pool is empty.
    #[must_use]
    pub fn roles_needing_ai(&self) -> Vec<Role> {
        self.iter()
            .filter(|(_, pool)| pool.is_empty())
            .map(|(role, _)| role)
            .collect()
    }
}
