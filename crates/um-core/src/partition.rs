//! Key-based partitioning of two record collections
//!
//! Every condition seen on either side lands in exactly one of four lists:
//! left only, right only, identical, or conflicting. All lists come back
//! sorted by [`compare_conditions`].

use crate::compare::Comparator;
use crate::record::{Record, Side};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Result of partitioning two documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    /// Keys present only in the left document
    pub left_only: Vec<Record>,
    /// Keys present only in the right document
    pub right_only: Vec<Record>,
    /// Keys present in both with differing content
    pub conflicts: Vec<Conflict>,
    /// Keys present in both with equal content (left record kept)
    pub identical: Vec<Record>,
    /// Keys that occurred more than once within one document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<DuplicateKey>,
}

/// Both versions of a conflicting record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub condition: String,
    pub left: Record,
    pub right: Record,
}

impl Conflict {
    /// The record on the given side
    pub fn version(&self, side: Side) -> &Record {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// A key repeated within a single document; the last occurrence was used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub side: Side,
    pub condition: String,
    pub count: usize,
}

/// Classification of a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    LeftOnly,
    RightOnly,
    Identical,
    Conflict,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::LeftOnly => "left_only",
            Category::RightOnly => "right_only",
            Category::Identical => "identical",
            Category::Conflict => "conflict",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSummary {
    pub left_only: usize,
    pub right_only: usize,
    pub conflicts: usize,
    pub identical: usize,
}

impl PartitionSummary {
    /// Number of distinct keys across both documents
    pub fn total(&self) -> usize {
        self.left_only + self.right_only + self.conflicts + self.identical
    }
}

impl Partition {
    pub fn summary(&self) -> PartitionSummary {
        PartitionSummary {
            left_only: self.left_only.len(),
            right_only: self.right_only.len(),
            conflicts: self.conflicts.len(),
            identical: self.identical.len(),
        }
    }

    /// Which list a key ended up in, if any
    pub fn category(&self, condition: &str) -> Option<Category> {
        let by_key = |r: &Record| compare_conditions(r.condition(), condition);
        if self.conflicts
            .binary_search_by(|c| compare_conditions(&c.condition, condition))
            .is_ok()
        {
            Some(Category::Conflict)
        } else if self.identical.binary_search_by(by_key).is_ok() {
            Some(Category::Identical)
        } else if self.left_only.binary_search_by(by_key).is_ok() {
            Some(Category::LeftOnly)
        } else if self.right_only.binary_search_by(by_key).is_ok() {
            Some(Category::RightOnly)
        } else {
            None
        }
    }

    /// Find a conflict by key
    pub fn find_conflict(&self, condition: &str) -> Option<&Conflict> {
        self.conflicts
            .binary_search_by(|c| compare_conditions(&c.condition, condition))
            .ok()
            .map(|i| &self.conflicts[i])
    }

    /// Keys of one category, in sorted order
    pub fn conditions(&self, category: Category) -> Vec<&str> {
        match category {
            Category::LeftOnly => self.left_only.iter().map(Record::condition).collect(),
            Category::RightOnly => self.right_only.iter().map(Record::condition).collect(),
            Category::Identical => self.identical.iter().map(Record::condition).collect(),
            Category::Conflict => self.conflicts.iter().map(|c| c.condition.as_str()).collect(),
        }
    }

    /// Keys eligible for inclusion toggling: identical, left only, right only
    pub fn non_conflicting(&self) -> impl Iterator<Item = &Record> {
        self.identical
            .iter()
            .chain(self.left_only.iter())
            .chain(self.right_only.iter())
    }

    /// Every key with its category, sorted
    pub fn classified(&self) -> Vec<(&str, Category)> {
        let mut all: Vec<(&str, Category)> = self
            .left_only
            .iter()
            .map(|r| (r.condition(), Category::LeftOnly))
            .chain(self.right_only.iter().map(|r| (r.condition(), Category::RightOnly)))
            .chain(self.identical.iter().map(|r| (r.condition(), Category::Identical)))
            .chain(self.conflicts.iter().map(|c| (c.condition.as_str(), Category::Conflict)))
            .collect();
        all.sort_by(|a, b| compare_conditions(a.0, b.0));
        all
    }
}

/// Partition with the default comparator
pub fn partition(left: &[Record], right: &[Record]) -> Partition {
    partition_with(left, right, &Comparator::default())
}

/// Partition two record collections by `condition`
pub fn partition_with(left: &[Record], right: &[Record], comparator: &Comparator) -> Partition {
    let mut duplicates = Vec::new();
    let left_map = key_map(left, Side::Left, &mut duplicates);
    let right_map = key_map(right, Side::Right, &mut duplicates);

    let mut result = Partition {
        duplicates,
        ..Partition::default()
    };

    for (condition, left_record) in &left_map {
        match right_map.get(condition) {
            None => result.left_only.push((*left_record).clone()),
            Some(right_record) => {
                if comparator.equal(left_record, right_record) {
                    result.identical.push((*left_record).clone());
                } else {
                    result.conflicts.push(Conflict {
                        condition: condition.to_string(),
                        left: (*left_record).clone(),
                        right: (*right_record).clone(),
                    });
                }
            }
        }
    }

    for (condition, right_record) in &right_map {
        if !left_map.contains_key(condition) {
            result.right_only.push((*right_record).clone());
        }
    }

    result.left_only.sort_by(|a, b| compare_conditions(a.condition(), b.condition()));
    result.right_only.sort_by(|a, b| compare_conditions(a.condition(), b.condition()));
    result.identical.sort_by(|a, b| compare_conditions(a.condition(), b.condition()));
    result.conflicts.sort_by(|a, b| compare_conditions(&a.condition, &b.condition));

    let summary = result.summary();
    debug!(
        left_only = summary.left_only,
        right_only = summary.right_only,
        conflicts = summary.conflicts,
        identical = summary.identical,
        "partitioned documents"
    );

    result
}

/// Build a key -> record map, last occurrence wins, recording repeats
fn key_map<'a>(
    records: &'a [Record],
    side: Side,
    duplicates: &mut Vec<DuplicateKey>,
) -> HashMap<&'a str, &'a Record> {
    let mut map = HashMap::with_capacity(records.len());
    // BTreeMap so duplicate reports come out in a stable order
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

    for record in records {
        *counts.entry(record.condition()).or_default() += 1;
        map.insert(record.condition(), record);
    }

    for (condition, count) in counts.into_iter().filter(|(_, n)| *n > 1) {
        warn!(%side, condition, count, "duplicate condition, keeping the last record");
        duplicates.push(DuplicateKey {
            side,
            condition: condition.to_string(),
            count,
        });
    }

    map
}

/// Collation used for every sorted list of conditions
///
/// Levels, in order: base letters with diacritics removed and case folded,
/// then accents (an unaccented letter sorts before its accented forms),
/// then case (lowercase first), then plain code point order.
pub fn compare_conditions(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| {
            a.nfd()
                .flat_map(char::to_lowercase)
                .cmp(b.nfd().flat_map(char::to_lowercase))
        })
        .then_with(|| {
            a.nfd()
                .map(char::is_uppercase)
                .cmp(b.nfd().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

/// Decomposed, mark-free, lowercased characters of a key
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}
