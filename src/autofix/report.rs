//! Autofix report types.
//!
//! These reports mirror what autofix logs, in a form callers can inspect
//! programmatically: which annotations were removed from which task, and
//! which records a batch dropped.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::component::FieldValidity;
use crate::ir::ImageId;

/// The result of autofixing one record.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AutofixReport {
    /// Image id of the record, if it has one.
    pub imageid: Option<ImageId>,

    /// Per-field validity masks, keyed by task name.
    pub validity: BTreeMap<String, FieldValidity>,

    /// Annotations removed, in ascending index order per task.
    pub removed: Vec<RemovedAnnotation>,

    /// Lines written to the report sink while fixing the record.
    pub messages: Vec<String>,
}

impl AutofixReport {
    /// Returns true if nothing was repaired or removed.
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.messages.is_empty()
    }

    /// Number of annotations removed across all tasks.
    pub fn num_removed(&self) -> usize {
        self.removed.len()
    }
}

impl fmt::Display for AutofixReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.imageid {
            Some(id) => writeln!(f, "Record {}:", id)?,
            None => writeln!(f, "Record (no imageid):")?,
        }
        if self.is_clean() {
            return writeln!(f, "  nothing to fix");
        }
        for message in &self.messages {
            writeln!(f, "  {}", message)?;
        }
        Ok(())
    }
}

/// One annotation removed by autofix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemovedAnnotation {
    /// Task the annotation belonged to.
    pub task: String,

    /// Index of the annotation before any removal.
    pub index: usize,

    /// Fields whose validity mask rejected the index.
    pub fields: Vec<String>,
}

impl fmt::Display for RemovedAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Removed annotation with index: {} from task '{}' (rejected by {})",
            self.index,
            self.task,
            self.fields.join(", ")
        )
    }
}

/// A record a batch autofix rejected.
#[derive(Clone, Debug, Serialize)]
pub struct DroppedRecord {
    /// Position of the record in the input batch.
    pub position: usize,

    pub imageid: Option<ImageId>,

    /// Display form of the abort error.
    pub reason: String,
}

/// The result of autofixing a batch of records.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchReport {
    /// Reports of the kept records, in output order.
    pub reports: Vec<AutofixReport>,

    /// Records removed from the output.
    pub dropped: Vec<DroppedRecord>,
}

impl BatchReport {
    pub fn kept_count(&self) -> usize {
        self.reports.len()
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Annotations removed across every kept record.
    pub fn removed_count(&self) -> usize {
        self.reports.iter().map(AutofixReport::num_removed).sum()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Autofix kept {} record(s), dropped {}, removed {} annotation(s)",
            self.kept_count(),
            self.dropped_count(),
            self.removed_count()
        )?;
        for dropped in &self.dropped {
            let id = dropped
                .imageid
                .map(|id| id.to_string())
                .unwrap_or_else(|| "?".to_string());
            writeln!(
                f,
                "  dropped #{} (imageid {}): {}",
                dropped.position, id, dropped.reason
            )?;
        }
        Ok(())
    }
}
