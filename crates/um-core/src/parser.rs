//! JSON parser for utterance documents

use crate::error::{Error, Result};
use crate::record::{json_type_name, Document, Record};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse a document file
pub fn parse_document<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_document_str(&content, &name)
}

/// Parse a document from a string; `source_name` is used in error messages
pub fn parse_document_str(content: &str, source_name: &str) -> Result<Document> {
    let root: Value = serde_json::from_str(content)
        .map_err(|e| Error::invalid_document(source_name, e.to_string()))?;

    let mut root = match root {
        Value::Object(map) => map,
        other => {
            return Err(Error::invalid_document(
                source_name,
                format!("expected a JSON object, found {}", json_type_name(&other)),
            ))
        }
    };

    let raw_utterances = match root.remove("utterances") {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(Error::invalid_document(
                source_name,
                "'utterances' array not found",
            ))
        }
    };

    let mut utterances = Vec::with_capacity(raw_utterances.len());
    for (idx, item) in raw_utterances.into_iter().enumerate() {
        let record = Record::try_from(item).map_err(|message| {
            Error::invalid_document(source_name, format!("utterance {}: {}", idx, message))
        })?;
        utterances.push(record);
    }

    let trains = match root.remove("trains") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::invalid_document(
                source_name,
                format!("'trains' must be an array, found {}", json_type_name(&other)),
            ))
        }
    };

    debug!(
        source = source_name,
        utterances = utterances.len(),
        trains = trains.len(),
        "parsed document"
    );

    Ok(Document { utterances, trains })
}
