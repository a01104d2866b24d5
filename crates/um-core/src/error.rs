//! Error types for um-core

use crate::record::Side;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in um-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content is not valid JSON or does not have the document shape
    #[error("error parsing {name}: {message}")]
    InvalidDocument { name: String, message: String },

    /// Export was requested while some conflicts have no resolution
    #[error("{count} conflict(s) still unresolved: {}", .conditions.join(", "))]
    UnresolvedConflicts {
        count: usize,
        conditions: Vec<String>,
    },

    /// An operation needed a document that has not been loaded
    #[error("no {0} document loaded")]
    DocumentNotLoaded(Side),

    /// Both documents are needed before records can be compared
    #[error("both documents must be loaded before comparing")]
    NotCompared,

    /// A conflict-only operation named a key that is not conflicting
    #[error("'{0}' is not a conflict")]
    NotAConflict(String),

    /// Undo requested with an empty history
    #[error("nothing to undo")]
    NothingToUndo,

    /// A configuration value was rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Build an input format error for the named file
    pub fn invalid_document(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidDocument {
            name: name.into(),
            message: message.into(),
        }
    }
}
