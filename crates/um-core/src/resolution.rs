//! Per-conflict side choices
//!
//! Updates return a new map and leave the old one untouched, so a session
//! can keep earlier states around for undo.

use crate::partition::Conflict;
use crate::record::Side;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which side was chosen for each resolved conflict
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionMap {
    choices: BTreeMap<String, Side>,
}

impl ResolutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chosen side for a key, `None` if unresolved
    pub fn get(&self, condition: &str) -> Option<Side> {
        self.choices.get(condition).copied()
    }

    /// Set or overwrite one key
    pub fn resolve(&self, condition: impl Into<String>, side: Side) -> Self {
        let mut next = self.clone();
        next.choices.insert(condition.into(), side);
        next
    }

    /// Set every listed conflict to the same side in one step
    pub fn resolve_all(&self, conflicts: &[Conflict], side: Side) -> Self {
        let mut next = self.clone();
        for conflict in conflicts {
            next.choices.insert(conflict.condition.clone(), side);
        }
        next
    }

    /// Conflicts with no recorded choice, in list order
    pub fn unresolved<'a>(&self, conflicts: &'a [Conflict]) -> Vec<&'a str> {
        conflicts
            .iter()
            .filter(|c| !self.choices.contains_key(&c.condition))
            .map(|c| c.condition.as_str())
            .collect()
    }

    /// True once every listed conflict has a choice
    pub fn is_complete(&self, conflicts: &[Conflict]) -> bool {
        conflicts.iter().all(|c| self.choices.contains_key(&c.condition))
    }

    /// Number of recorded choices, including keys that are not conflicts
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Side)> {
        self.choices.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, Side)> for ResolutionMap {
    fn from_iter<I: IntoIterator<Item = (String, Side)>>(iter: I) -> Self {
        Self {
            choices: iter.into_iter().collect(),
        }
    }
}
