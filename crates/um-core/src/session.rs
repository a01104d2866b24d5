//! A comparison session over one pair of documents
//!
//! The session owns both documents, the partition computed from them and a
//! versioned snapshot of the user's choices. Loading either document throws
//! away the partition and all choices and starts over. Every change to the
//! choices produces a new snapshot; the previous ones are kept for undo.

use crate::assemble::assemble;
use crate::compare::Comparator;
use crate::config::MergeConfig;
use crate::decisions::{DecisionFile, DecisionOutcome};
use crate::diff::{diff_records, DiffLine};
use crate::error::{Error, Result};
use crate::inclusion::{InclusionMap, InclusionState};
use crate::parser::{parse_document, parse_document_str};
use crate::partition::{partition_with, Category, Partition};
use crate::record::{Document, Side};
use crate::resolution::ResolutionMap;
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info};

/// A parsed document and the name it was loaded under
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub name: String,
    pub document: Document,
}

/// The user's choices at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Increases by one with every change, including reloads
    pub version: u64,
    pub resolutions: ResolutionMap,
    pub inclusions: InclusionMap,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    config: MergeConfig,
    comparator: Comparator,
    left: Option<LoadedDocument>,
    right: Option<LoadedDocument>,
    partition: Option<Partition>,
    current: Snapshot,
    /// Oldest first, at most `config.undo_limit` entries
    history: VecDeque<Snapshot>,
}

impl Session {
    pub fn new(config: MergeConfig) -> Self {
        Self {
            comparator: Comparator::from_config(&config),
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Parse `text` and load it as one side
    ///
    /// On a parse error the side is left unloaded and comparison stops
    /// until a valid document is supplied.
    pub fn load(&mut self, side: Side, name: &str, text: &str) -> Result<()> {
        match parse_document_str(text, name) {
            Ok(document) => {
                self.load_document(side, name, document);
                Ok(())
            }
            Err(e) => {
                self.unload(side);
                Err(e)
            }
        }
    }

    /// Read and load a file as one side
    pub fn load_file<P: AsRef<Path>>(&mut self, side: Side, path: P) -> Result<()> {
        let path = path.as_ref();
        match parse_document(path) {
            Ok(document) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.load_document(side, &name, document);
                Ok(())
            }
            Err(e) => {
                self.unload(side);
                Err(e)
            }
        }
    }

    /// Load an already parsed document as one side
    pub fn load_document(&mut self, side: Side, name: &str, document: Document) {
        debug!(%side, name, utterances = document.len(), "loaded document");
        *self.slot(side) = Some(LoadedDocument {
            name: name.to_string(),
            document,
        });
        self.repartition();
    }

    /// Drop one side; the partition and all choices go with it
    pub fn unload(&mut self, side: Side) {
        *self.slot(side) = None;
        self.repartition();
    }

    pub fn document(&self, side: Side) -> Option<&LoadedDocument> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }

    /// Current partition, present once both sides are loaded
    pub fn partition(&self) -> Option<&Partition> {
        self.partition.as_ref()
    }

    /// Current partition or `NotCompared`
    pub fn require_partition(&self) -> Result<&Partition> {
        self.partition.as_ref().ok_or(Error::NotCompared)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.current
    }

    pub fn version(&self) -> u64 {
        self.current.version
    }

    pub fn resolutions(&self) -> &ResolutionMap {
        &self.current.resolutions
    }

    pub fn inclusions(&self) -> &InclusionMap {
        &self.current.inclusions
    }

    /// Choose a side for one conflict
    pub fn resolve(&mut self, condition: &str, side: Side) -> Result<()> {
        self.require_partition()?;
        let resolutions = self.current.resolutions.resolve(condition, side);
        let inclusions = self.current.inclusions.clone();
        self.commit(resolutions, inclusions);
        Ok(())
    }

    /// Choose the same side for every conflict
    pub fn resolve_all(&mut self, side: Side) -> Result<()> {
        let resolutions = self
            .current
            .resolutions
            .resolve_all(&self.require_partition()?.conflicts, side);
        let inclusions = self.current.inclusions.clone();
        self.commit(resolutions, inclusions);
        Ok(())
    }

    /// Flip inclusion for one key
    pub fn toggle(&mut self, condition: &str) -> Result<()> {
        self.require_partition()?;
        let inclusions = self.current.inclusions.toggle(condition);
        let resolutions = self.current.resolutions.clone();
        self.commit(resolutions, inclusions);
        Ok(())
    }

    /// Select-all / deselect-all over the given keys
    pub fn toggle_all<S: AsRef<str>>(&mut self, conditions: &[S]) -> Result<()> {
        self.require_partition()?;
        let inclusions = self.current.inclusions.toggle_all(conditions);
        let resolutions = self.current.resolutions.clone();
        self.commit(resolutions, inclusions);
        Ok(())
    }

    /// Select-all / deselect-all over one category
    pub fn toggle_category(&mut self, category: Category) -> Result<()> {
        let conditions: Vec<String> = self
            .require_partition()?
            .conditions(category)
            .into_iter()
            .map(str::to_string)
            .collect();
        self.toggle_all(&conditions)
    }

    /// Restore the snapshot before the last change
    pub fn undo(&mut self) -> Result<()> {
        let previous = self.history.pop_back().ok_or(Error::NothingToUndo)?;
        debug!(from = self.current.version, to = previous.version, "undo");
        self.current = previous;
        Ok(())
    }

    /// Number of snapshots available to undo
    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    /// Export state of one key
    pub fn inclusion_state(&self, condition: &str) -> Option<InclusionState> {
        let partition = self.partition.as_ref()?;
        self.current
            .inclusions
            .state(partition, &self.current.resolutions, condition)
    }

    /// Line diff of one conflict with volatile fields removed
    pub fn conflict_diff(&self, condition: &str) -> Result<Vec<DiffLine>> {
        let conflict = self
            .require_partition()?
            .find_conflict(condition)
            .ok_or_else(|| Error::NotAConflict(condition.to_string()))?;
        diff_records(&conflict.left, &conflict.right, &self.config.volatile_fields)
    }

    /// Conflicts still missing a choice
    pub fn unresolved(&self) -> Vec<&str> {
        match &self.partition {
            Some(p) => self.current.resolutions.unresolved(&p.conflicts),
            None => Vec::new(),
        }
    }

    /// True when both documents are loaded and every conflict is resolved
    pub fn can_export(&self) -> bool {
        self.partition
            .as_ref()
            .is_some_and(|p| self.current.resolutions.is_complete(&p.conflicts))
    }

    /// Merged document from the current choices, unresolved conflicts omitted
    pub fn assemble(&self) -> Result<Document> {
        let partition = self.require_partition()?;
        let left = self.document(Side::Left).ok_or(Error::DocumentNotLoaded(Side::Left))?;
        let right = self.document(Side::Right).ok_or(Error::DocumentNotLoaded(Side::Right))?;

        Ok(assemble(
            partition,
            &self.current.resolutions,
            &self.current.inclusions,
            &left.document.trains,
            &right.document.trains,
        ))
    }

    /// Merged document, refused while any conflict is unresolved
    pub fn export(&self) -> Result<Document> {
        self.require_partition()?;
        let unresolved = self.unresolved();
        if !unresolved.is_empty() {
            return Err(Error::UnresolvedConflicts {
                count: unresolved.len(),
                conditions: unresolved.into_iter().map(str::to_string).collect(),
            });
        }
        self.assemble()
    }

    /// Export and write to `path`
    pub fn export_to<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let document = self.export()?;
        document.save(path.as_ref())?;
        info!(
            path = %path.as_ref().display(),
            utterances = document.len(),
            trains = document.trains.len(),
            "exported merged document"
        );
        Ok(document)
    }

    /// Apply saved choices as a single undoable step
    pub fn apply_decisions(&mut self, decisions: &DecisionFile) -> Result<DecisionOutcome> {
        let partition = self.require_partition()?;
        let mut outcome = DecisionOutcome::default();
        let mut resolutions = self.current.resolutions.clone();
        let mut inclusions = self.current.inclusions.clone();

        for (condition, side) in decisions.resolutions.iter() {
            if partition.find_conflict(condition).is_some() {
                resolutions = resolutions.resolve(condition, side);
                outcome.resolutions_applied += 1;
            } else {
                outcome.ignored += 1;
            }
        }

        for condition in &decisions.excluded {
            match partition.category(condition) {
                Some(Category::Conflict) | None => outcome.ignored += 1,
                Some(_) => {
                    inclusions = inclusions.set(condition.as_str(), false);
                    outcome.exclusions_applied += 1;
                }
            }
        }

        self.commit(resolutions, inclusions);
        Ok(outcome)
    }

    /// Capture the current choices as a decisions file
    pub fn decisions(&self) -> Result<DecisionFile> {
        let partition = self.require_partition()?;
        let mut file = DecisionFile::new(
            self.left.as_ref().map(|d| d.name.clone()),
            self.right.as_ref().map(|d| d.name.clone()),
        );
        file.resolutions = partition
            .conflicts
            .iter()
            .filter_map(|c| {
                self.current
                    .resolutions
                    .get(&c.condition)
                    .map(|side| (c.condition.clone(), side))
            })
            .collect();
        file.excluded = partition
            .non_conflicting()
            .map(|r| r.condition())
            .filter(|c| !self.current.inclusions.is_included(c))
            .map(str::to_string)
            .collect();
        file.pending = self.unresolved().into_iter().map(str::to_string).collect();
        Ok(file)
    }

    fn slot(&mut self, side: Side) -> &mut Option<LoadedDocument> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn commit(&mut self, resolutions: ResolutionMap, inclusions: InclusionMap) {
        let next = Snapshot {
            version: self.current.version + 1,
            resolutions,
            inclusions,
        };
        let previous = std::mem::replace(&mut self.current, next);
        self.history.push_back(previous);
        while self.history.len() > self.config.undo_limit {
            self.history.pop_front();
        }
    }

    /// Recompute from scratch; old choices never carry over
    fn repartition(&mut self) {
        self.partition = match (&self.left, &self.right) {
            (Some(left), Some(right)) => Some(partition_with(
                &left.document.utterances,
                &right.document.utterances,
                &self.comparator,
            )),
            _ => None,
        };

        let inclusions = self
            .partition
            .as_ref()
            .map(InclusionMap::for_partition)
            .unwrap_or_default();

        self.current = Snapshot {
            version: self.current.version + 1,
            resolutions: ResolutionMap::new(),
            inclusions,
        };
        self.history.clear();
    }
}
