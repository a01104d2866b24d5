//! Structural equality of records, ignoring volatile fields

use crate::config::{EqualityMode, MergeConfig};
use crate::record::{Record, VOLATILE_FIELDS};
use serde_json::{Map, Number, Value};

/// Decides whether two records carry the same content
#[derive(Debug, Clone)]
pub struct Comparator {
    ignored: Vec<String>,
    mode: EqualityMode,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(VOLATILE_FIELDS.iter().map(|f| f.to_string()).collect(), EqualityMode::Canonical)
    }
}

impl Comparator {
    pub fn new(ignored: Vec<String>, mode: EqualityMode) -> Self {
        Self { ignored, mode }
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        Self::new(config.volatile_fields.clone(), config.equality)
    }

    /// Fields this comparator skips
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// True if the records match once ignored fields are removed
    pub fn equal(&self, a: &Record, b: &Record) -> bool {
        let a = a.projection(&self.ignored[..]);
        let b = b.projection(&self.ignored[..]);

        match self.mode {
            EqualityMode::Canonical => objects_equal(&a, &b),
            EqualityMode::Textual => {
                let a = Value::Object(a);
                let b = Value::Object(b);
                normalized(&a, false).to_string() == normalized(&b, false).to_string()
            }
        }
    }
}

/// Compare two records with the default volatile fields and canonical equality
pub fn equal(a: &Record, b: &Record) -> bool {
    Comparator::default().equal(a, b)
}

/// Deep equality where object key order is irrelevant and numbers compare by value
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| values_equal(p, q))
        }
        (Value::Object(x), Value::Object(y)) => objects_equal(x, y),
        _ => false,
    }
}

/// Serialized form shared by any two [`values_equal`] inputs
///
/// Object keys are sorted and whole floats print as integers. Numbers past
/// 2^53 keep their own spelling.
pub fn canonical_text(value: &Value) -> String {
    normalized(value, true).to_string()
}

/// Rewrite a value with whole floats as integers, optionally sorting keys
fn normalized(value: &Value, sort_keys: bool) -> Value {
    match value {
        Value::Number(n) => Value::Number(whole_number(n).unwrap_or_else(|| n.clone())),
        Value::Array(items) => Value::Array(items.iter().map(|v| normalized(v, sort_keys)).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            if sort_keys {
                entries.sort_by(|x, y| x.0.cmp(y.0));
            }
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), normalized(v, sort_keys)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

/// `1.0` and `-0.0` print as `1` and `0` in the source format
fn whole_number(n: &Number) -> Option<Number> {
    // beyond 2^53 a float no longer maps to a single integer
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    let f = n.as_f64().filter(|_| n.is_f64())?;
    if f.fract() == 0.0 && f.abs() <= MAX_EXACT {
        Some(Number::from(f as i64))
    } else {
        None
    }
}

fn objects_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    // 1 and 1.0 are the same JSON number
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
