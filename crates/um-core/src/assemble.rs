//! Builds the merged document from a partition and the user's choices

use crate::compare::canonical_text;
use crate::inclusion::InclusionMap;
use crate::partition::{compare_conditions, Partition};
use crate::record::{Document, Record};
use crate::resolution::ResolutionMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Merge the partition into one document
///
/// Non-conflicting records are kept when marked included; a conflict is kept
/// only once a side has been chosen for it. Does not check that every
/// conflict is resolved; unresolved ones are simply left out.
pub fn assemble(
    partition: &Partition,
    resolutions: &ResolutionMap,
    inclusions: &InclusionMap,
    left_trains: &[Value],
    right_trains: &[Value],
) -> Document {
    let mut merged: HashMap<&str, &Record> = HashMap::new();

    for record in partition.non_conflicting() {
        if inclusions.is_included(record.condition()) {
            merged.insert(record.condition(), record);
        }
    }

    for conflict in &partition.conflicts {
        if let Some(side) = resolutions.get(&conflict.condition) {
            merged.insert(conflict.condition.as_str(), conflict.version(side));
        }
    }

    let mut utterances: Vec<Record> = merged.into_values().cloned().collect();
    utterances.sort_by(|a, b| compare_conditions(a.condition(), b.condition()));

    let trains = merge_trains(left_trains, right_trains);

    debug!(
        utterances = utterances.len(),
        trains = trains.len(),
        "assembled merged document"
    );

    Document { utterances, trains }
}

/// Concatenate left then right, keeping the first of each structurally equal value
pub fn merge_trains(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut seen: HashSet<String> = HashSet::with_capacity(left.len() + right.len());
    left.iter()
        .chain(right)
        .filter(|train| seen.insert(canonical_text(train)))
        .cloned()
        .collect()
}
