//! Line-level diff between two versions of a record
//!
//! Display only: the partition never looks at this. Both records are
//! pretty-printed with the volatile fields removed and compared line by line
//! using a longest-common-subsequence table.

use crate::error::Result;
use crate::record::Record;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// What happened to a line going from left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Same,
    Removed,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub op: DiffOp,
    pub text: String,
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.op {
            DiffOp::Same => ' ',
            DiffOp::Removed => '-',
            DiffOp::Added => '+',
        };
        write!(f, "{} {}", marker, self.text)
    }
}

/// Diff two records with the given fields left out
pub fn diff_records(left: &Record, right: &Record, ignored: &[String]) -> Result<Vec<DiffLine>> {
    let left = serde_json::to_string_pretty(&Value::Object(left.projection(ignored)))?;
    let right = serde_json::to_string_pretty(&Value::Object(right.projection(ignored)))?;
    Ok(diff_lines(&left, &right))
}

/// Line diff of two texts
pub fn diff_lines(left: &str, right: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = left.lines().collect();
    let b: Vec<&str> = right.lines().collect();

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(line(DiffOp::Same, a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(line(DiffOp::Removed, a[i]));
            i += 1;
        } else {
            out.push(line(DiffOp::Added, b[j]));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| line(DiffOp::Removed, l)));
    out.extend(b[j..].iter().map(|l| line(DiffOp::Added, l)));
    out
}

/// True if any line differs
pub fn has_changes(lines: &[DiffLine]) -> bool {
    lines.iter().any(|l| l.op != DiffOp::Same)
}

fn line(op: DiffOp, text: &str) -> DiffLine {
    DiffLine {
        op,
        text: text.to_string(),
    }
}
