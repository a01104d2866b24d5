//! Per-key classification report, written as CSV or JSON

use crate::error::{Error, Result};
use crate::inclusion::InclusionState;
use crate::partition::Category;
use crate::record::Side;
use crate::session::Session;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub condition: String,
    pub category: Category,
    pub inclusion: InclusionState,
    /// Chosen side, conflicts only
    pub resolution: Option<Side>,
}

/// Classification of every key in a session, sorted by condition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationReport {
    pub left: String,
    pub right: String,
    pub rows: Vec<ReportRow>,
}

impl ClassificationReport {
    pub fn from_session(session: &Session) -> Result<Self> {
        let partition = session.require_partition()?;
        let rows = partition
            .classified()
            .into_iter()
            .map(|(condition, category)| ReportRow {
                condition: condition.to_string(),
                category,
                inclusion: session
                    .inclusion_state(condition)
                    .unwrap_or(InclusionState::Excluded),
                resolution: match category {
                    Category::Conflict => session.resolutions().get(condition),
                    _ => None,
                },
            })
            .collect();

        let name = |side| {
            session
                .document(side)
                .map(|d| d.name.clone())
                .unwrap_or_default()
        };

        Ok(Self {
            left: name(Side::Left),
            right: name(Side::Right),
            rows,
        })
    }

    /// Rows in one category
    pub fn count(&self, category: Category) -> usize {
        self.rows.iter().filter(|r| r.category == category).count()
    }

    /// Write the rows as CSV with a header line
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Render the rows as a CSV string
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &self.rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Write the whole report as pretty JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
