//! um-core: Core library for comparing and merging utterance documents
//!
//! This library provides functionality to:
//! - Parse documents holding a keyed list of utterances plus `trains`
//! - Partition two documents into left-only, right-only, identical and conflicting records
//! - Track conflict resolutions and per-record inclusion as undoable snapshots
//! - Assemble the merged document and write it out
//! - Save and replay decisions, render record diffs and classification reports

pub mod assemble;
pub mod compare;
pub mod config;
pub mod decisions;
pub mod diff;
pub mod error;
pub mod inclusion;
pub mod parser;
pub mod partition;
pub mod record;
pub mod report;
pub mod resolution;
pub mod session;

pub use assemble::{assemble, merge_trains};
pub use compare::{canonical_text, equal, Comparator};
pub use config::{EqualityMode, MergeConfig, DEFAULT_OUTPUT_FILE, DEFAULT_UNDO_LIMIT};
pub use decisions::{DecisionFile, DecisionOutcome};
pub use diff::{diff_records, DiffLine, DiffOp};
pub use error::{Error, Result};
pub use inclusion::{InclusionMap, InclusionState};
pub use parser::{parse_document, parse_document_str};
pub use partition::{partition, partition_with, Category, Conflict, Partition, PartitionSummary};
pub use record::{Document, Record, Side, KEY_FIELD, VOLATILE_FIELDS};
pub use report::{ClassificationReport, ReportRow};
pub use resolution::ResolutionMap;
pub use session::{LoadedDocument, Session, Snapshot};
