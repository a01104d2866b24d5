//! Merge configuration
//!
//! Loaded from an optional JSON file; every field falls back to its default.

use crate::error::{Error, Result};
use crate::record::{KEY_FIELD, VOLATILE_FIELDS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the exported file
pub const DEFAULT_OUTPUT_FILE: &str = "merged-utterances.json";

/// Default number of snapshots kept for undo
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// How two records are compared once volatile fields are removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqualityMode {
    /// Recursive structural equality, object key order ignored
    #[default]
    Canonical,
    /// Compact serializations compared as text, so key order matters
    Textual,
}

/// Settings shared by the comparator, the CLI and the FFI surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Fields excluded from equality and from the line diff
    pub volatile_fields: Vec<String>,
    /// Comparison strategy
    pub equality: EqualityMode,
    /// Where `merge` writes when no output path is given
    pub output_file: PathBuf,
    /// Oldest snapshots are dropped once undo history grows past this
    pub undo_limit: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            volatile_fields: VOLATILE_FIELDS.iter().map(|f| f.to_string()).collect(),
            equality: EqualityMode::default(),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            undo_limit: DEFAULT_UNDO_LIMIT,
        }
    }
}

impl MergeConfig {
    /// Load a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: MergeConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file if a path is given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Save the config to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would break the key invariant
    pub fn validate(&self) -> Result<()> {
        if self.volatile_fields.iter().any(|f| f == KEY_FIELD) {
            return Err(Error::InvalidConfig(format!(
                "'{}' is the record key and cannot be volatile",
                KEY_FIELD
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.volatile_fields, vec!["flows", "id", "parent"]);
        assert_eq!(config.equality, EqualityMode::Canonical);
        assert_eq!(config.output_file, PathBuf::from("merged-utterances.json"));
        assert_eq!(config.undo_limit, 100);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: MergeConfig = serde_json::from_str(r#"{"equality":"textual"}"#).unwrap();
        assert_eq!(config.equality, EqualityMode::Textual);
        assert_eq!(config.volatile_fields.len(), 3);
        assert_eq!(config.undo_limit, DEFAULT_UNDO_LIMIT);

        let config: MergeConfig = serde_json::from_str(r#"{"undo_limit":5}"#).unwrap();
        assert_eq!(config.undo_limit, 5);
    }

    #[test]
    fn test_key_field_cannot_be_volatile() {
        let config = MergeConfig {
            volatile_fields: vec!["condition".to_string()],
            ..MergeConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
