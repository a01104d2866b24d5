//! Core record and document types for utterance data

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Field holding the unique key of a record
pub const KEY_FIELD: &str = "condition";

/// Fields ignored when comparing or diffing records
pub const VOLATILE_FIELDS: &[&str] = &["flows", "id", "parent"];

/// One utterance: an open set of JSON fields keyed by a string `condition`
///
/// Field order is preserved as read, so a record written back out looks like
/// the record that came in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Record(Map<String, Value>);

impl Record {
    /// The record's key
    pub fn condition(&self) -> &str {
        // Construction guarantees a string key
        self.0.get(KEY_FIELD).and_then(Value::as_str).unwrap_or_default()
    }

    /// Get a field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// All fields, in their original order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Copy of the fields with the named ones removed
    pub fn projection(&self, ignored: &[impl AsRef<str>]) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(k, _)| !ignored.iter().any(|f| f.as_ref() == k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Convert into a plain JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        match map.get(KEY_FIELD) {
            Some(Value::String(_)) => Ok(Record(map)),
            Some(other) => Err(format!(
                "'{}' must be a string, found {}",
                KEY_FIELD,
                json_type_name(other)
            )),
            None => Err(format!("missing '{}' field", KEY_FIELD)),
        }
    }
}

impl TryFrom<Value> for Record {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Record::try_from(map),
            other => Err(format!("expected an object, found {}", json_type_name(&other))),
        }
    }
}

impl From<Record> for Map<String, Value> {
    fn from(record: Record) -> Self {
        record.0
    }
}

/// A document of utterances plus the auxiliary `trains` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Keyed records
    pub utterances: Vec<Record>,
    /// Auxiliary values, merged by deduplication only
    #[serde(default)]
    pub trains: Vec<Value>,
}

impl Document {
    /// Create a document from its parts
    pub fn new(utterances: Vec<Record>, trains: Vec<Value>) -> Self {
        Self { utterances, trains }
    }

    /// Number of utterances
    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    /// Check if the document has no utterances
    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// Find an utterance by condition (last one wins, like the partitioner)
    pub fn find(&self, condition: &str) -> Option<&Record> {
        self.utterances
            .iter()
            .rev()
            .find(|r| r.condition() == condition)
    }

    /// Serialize with two-space indentation
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_pretty_json()?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Which of the two loaded documents something refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// The other side
    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "1" => Ok(Side::Left),
            "right" | "2" => Ok(Side::Right),
            other => Err(format!("unknown side '{}', expected left or right", other)),
        }
    }
}

/// Name of a JSON value's type, for error messages
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
