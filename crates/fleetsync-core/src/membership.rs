use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Ordered list of peer host addresses making up the fleet.
///
/// Equality is positional. Callers that want order-independent comparison
/// must sort before building the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipSet(Vec<String>);

impl MembershipSet {
    /// Create a set preserving the given order.
    pub fn new(peers: Vec<String>) -> Self {
        Self(peers)
    }

    /// Create a set with peers sorted lexically.
    pub fn sorted(mut peers: Vec<String>) -> Self {
        peers.sort();
        Self(peers)
    }

    /// Single-peer set, used in standalone mode.
    pub fn single(peer: impl Into<String>) -> Self {
        Self(vec![peer.into()])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for MembershipSet {
    fn from(peers: Vec<String>) -> Self {
        Self::new(peers)
    }
}

impl std::fmt::Display for MembershipSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Whether `new` differs from `old`.
///
/// Different lengths always count as a change; otherwise any positional
/// mismatch does.
pub fn has_changed(old: &MembershipSet, new: &MembershipSet) -> bool {
    if old.len() != new.len() {
        return true;
    }
    old.iter().zip(new.iter()).any(|(a, b)| a != b)
}

/// Peers that joined and left between two sets. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipDelta {
    pub fn between(old: &MembershipSet, new: &MembershipSet) -> Self {
        let before: HashSet<&String> = old.iter().collect();
        let after: HashSet<&String> = new.iter().collect();

        Self {
            added: new
                .iter()
                .filter(|p| !before.contains(p))
                .cloned()
                .collect(),
            removed: old
                .iter()
                .filter(|p| !after.contains(p))
                .cloned()
                .collect(),
        }
    }

    /// True when the two sets hold the same peers in a different order.
    pub fn is_reorder(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
