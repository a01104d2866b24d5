//! Decisions file: saved conflict resolutions and exclusions
//!
//! Lets a merge be replayed without an interactive session. The file is
//! plain JSON so it can be edited by hand between runs.

use crate::error::{Error, Result};
use crate::partition::Partition;
use crate::record::Side;
use crate::resolution::ResolutionMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// User choices for one pair of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionFile {
    /// Name of the left document these choices were made against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    /// Name of the right document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    /// When the file was written
    pub saved_at: DateTime<Utc>,
    /// Chosen side per conflicting condition
    #[serde(default)]
    pub resolutions: ResolutionMap,
    /// Non-conflicting conditions to leave out of the merge
    #[serde(default)]
    pub excluded: Vec<String>,
    /// Conflicts still waiting for a choice; informational only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<String>,
}

/// How many decisions took effect when applied to a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub resolutions_applied: usize,
    pub exclusions_applied: usize,
    /// Entries naming conditions that are not conflicts (for resolutions)
    /// or not toggleable (for exclusions) in the current partition
    pub ignored: usize,
}

impl DecisionFile {
    /// Create an empty decision set stamped with the current time
    pub fn new(left: Option<String>, right: Option<String>) -> Self {
        Self {
            left,
            right,
            saved_at: Utc::now(),
            resolutions: ResolutionMap::new(),
            excluded: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Template listing every conflict; resolved to `prefer` when given
    pub fn template(
        partition: &Partition,
        left: Option<String>,
        right: Option<String>,
        prefer: Option<Side>,
    ) -> Self {
        let mut file = Self::new(left, right);
        match prefer {
            Some(side) => file.resolutions = file.resolutions.resolve_all(&partition.conflicts, side),
            None => {
                file.pending = partition
                    .conflicts
                    .iter()
                    .map(|c| c.condition.clone())
                    .collect()
            }
        }
        file
    }

    /// Load a decisions file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the decisions file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
