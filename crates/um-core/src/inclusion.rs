//! Per-key inclusion choices for non-conflicting records

use crate::partition::{Category, Partition};
use crate::resolution::ResolutionMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether each non-conflicting key goes into the merged output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InclusionMap {
    included: BTreeMap<String, bool>,
}

/// What will happen to a key on export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionState {
    Included,
    Excluded,
    /// A conflict with no chosen side yet
    PendingResolution,
}

impl InclusionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every identical, left-only and right-only key set to included
    pub fn for_partition(partition: &Partition) -> Self {
        Self {
            included: partition
                .non_conflicting()
                .map(|r| (r.condition().to_string(), true))
                .collect(),
        }
    }

    /// True only for keys explicitly marked included
    pub fn is_included(&self, condition: &str) -> bool {
        self.included.get(condition).copied().unwrap_or(false)
    }

    /// Raw entry, `None` when the key was never set
    pub fn get(&self, condition: &str) -> Option<bool> {
        self.included.get(condition).copied()
    }

    /// Set one key explicitly
    pub fn set(&self, condition: impl Into<String>, included: bool) -> Self {
        let mut next = self.clone();
        next.included.insert(condition.into(), included);
        next
    }

    /// Flip one key; a missing key counts as excluded and becomes included
    pub fn toggle(&self, condition: &str) -> Self {
        let flipped = !self.is_included(condition);
        self.set(condition, flipped)
    }

    /// Include all listed keys unless all are already included, then exclude all
    pub fn toggle_all<S: AsRef<str>>(&self, conditions: &[S]) -> Self {
        if conditions.is_empty() {
            return self.clone();
        }
        let all_included = conditions.iter().all(|c| self.is_included(c.as_ref()));

        let mut next = self.clone();
        for condition in conditions {
            next.included.insert(condition.as_ref().to_string(), !all_included);
        }
        next
    }

    /// Resolve a key's export state against the current partition and choices
    pub fn state(
        &self,
        partition: &Partition,
        resolutions: &ResolutionMap,
        condition: &str,
    ) -> Option<InclusionState> {
        let state = match partition.category(condition)? {
            Category::Conflict => match resolutions.get(condition) {
                Some(_) => InclusionState::Included,
                None => InclusionState::PendingResolution,
            },
            _ if self.is_included(condition) => InclusionState::Included,
            _ => InclusionState::Excluded,
        };
        Some(state)
    }

    /// Number of keys currently marked included
    pub fn included_count(&self) -> usize {
        self.included.values().filter(|v| **v).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.included.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use crate::record::{Record, Side};
    use serde_json::json;

    fn sample() -> Partition {
        let left = vec![
            Record::try_from(json!({"condition": "a"})).unwrap(),
            Record::try_from(json!({"condition": "x", "v": 1})).unwrap(),
        ];
        let right = vec![
            Record::try_from(json!({"condition": "b"})).unwrap(),
            Record::try_from(json!({"condition": "x", "v": 2})).unwrap(),
        ];
        partition(&left, &right)
    }

    #[test]
    fn test_defaults_exclude_conflicts() {
        let map = InclusionMap::for_partition(&sample());
        assert_eq!(map.get("a"), Some(true));
        assert_eq!(map.get("b"), Some(true));
        assert_eq!(map.get("x"), None);
    }

    #[test]
    fn test_toggle_missing_key_includes() {
        let map = InclusionMap::new().toggle("new");
        assert!(map.is_included("new"));
        assert!(!map.toggle("new").is_included("new"));
    }

    #[test]
    fn test_toggle_all_mixed_includes_everything() {
        let map = InclusionMap::new().set("a", true).set("b", false);
        let next = map.toggle_all(&["a", "b"]);
        assert!(next.is_included("a"));
        assert!(next.is_included("b"));
    }

    #[test]
    fn test_toggle_all_all_included_excludes() {
        let map = InclusionMap::new().set("a", true).set("b", true);
        let next = map.toggle_all(&["a", "b"]);
        assert_eq!(next.get("a"), Some(false));
        assert_eq!(next.get("b"), Some(false));
    }

    #[test]
    fn test_toggle_all_empty_is_noop() {
        let map = InclusionMap::new().set("a", false);
        let empty: [&str; 0] = [];
        assert_eq!(map.toggle_all(&empty), map);
    }

    #[test]
    fn test_three_state_view() {
        let partition = sample();
        let map = InclusionMap::for_partition(&partition).toggle("a");
        let none = ResolutionMap::new();

        assert_eq!(map.state(&partition, &none, "a"), Some(InclusionState::Excluded));
        assert_eq!(map.state(&partition, &none, "b"), Some(InclusionState::Included));
        assert_eq!(
            map.state(&partition, &none, "x"),
            Some(InclusionState::PendingResolution)
        );

        let resolved = none.resolve("x", Side::Left);
        assert_eq!(map.state(&partition, &resolved, "x"), Some(InclusionState::Included));
        assert_eq!(map.state(&partition, &resolved, "missing"), None);
    }
}
