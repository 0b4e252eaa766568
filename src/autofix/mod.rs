//! Annotation validation and repair.
//!
//! Autofix keeps the per-annotation lists of a record consistent:
//!
//! 1. Every task composite reports its annotation count per field. If any
//!    task's counts disagree the whole record is rejected with
//!    [`RecordError::AnnotationAlignment`], before anything is repaired.
//! 2. Every component validates its own elements, repairing in place where it
//!    can (a bbox is clamped to the image), and returns one validity mask per
//!    field.
//! 3. Within each task the masks are AND-ed by index, and every rejected index
//!    is removed from all fields of that task, highest index first. Removal
//!    starts only once every task has validated, so a record rejected in step
//!    2 keeps all of its annotations.
//!
//! Repairs and removals are reported through a [`ReportSink`] acquired for the
//! duration of one record. [`autofix_batch`] drops records that abort and
//! keeps the rest in their original order.

mod report;
mod sink;

pub use report::{AutofixReport, BatchReport, DroppedRecord, RemovedAnnotation};
pub use sink::ReportSink;

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::component::FieldValidity;
use crate::composite::merge_all;
use crate::error::RecordError;
use crate::ir::Collaborators;
use crate::record::Record;

/// Indices rejected by at least one field, ascending.
fn rejected_indices(validity: &FieldValidity) -> Vec<(usize, Vec<String>)> {
    let len = validity.values().map(Vec::len).max().unwrap_or(0);
    (0..len)
        .filter_map(|index| {
            let fields: Vec<String> = validity
                .iter()
                .filter(|(_, mask)| mask.get(index) == Some(&false))
                .map(|(field, _)| field.clone())
                .collect();
            (!fields.is_empty()).then_some((index, fields))
        })
        .collect()
}

impl Record {
    /// Checks annotation alignment, repairs what it can and removes the
    /// annotations that stay invalid.
    ///
    /// # Errors
    /// [`RecordError::AnnotationAlignment`] or [`RecordError::AutofixAbort`]
    /// reject the record; other errors come from component hooks.
    pub fn autofix(&mut self, tools: &Collaborators) -> Result<AutofixReport, RecordError> {
        let imageid = self.imageid();
        let header = match imageid {
            Some(id) => format!("Autofixing record with imageid: {}", id),
            None => "Autofixing record with imageid: (unset)".to_string(),
        };
        let mut sink = ReportSink::new(header);

        for (task, counts) in self.num_annotations() {
            let distinct: BTreeSet<usize> = counts.values().copied().collect();
            if distinct.len() > 1 {
                return Err(RecordError::AnnotationAlignment { task, counts });
            }
        }

        let results =
            self.reduce_mut_by_task(|component, peers| component.autofix(peers, tools, &mut sink));

        // Any task failing rejects the record before a single removal.
        let validities = results
            .into_iter()
            .map(|(task, task_results)| {
                let masks = task_results.into_iter().collect::<Result<Vec<_>, _>>()?;
                Ok((task, merge_all(masks)))
            })
            .collect::<Result<Vec<_>, RecordError>>()?;

        let mut report = AutofixReport {
            imageid,
            ..AutofixReport::default()
        };
        for (task, validity) in validities {
            let rejected = rejected_indices(&validity);
            for (index, fields) in &rejected {
                sink.push(format!(
                    "Removed annotation with index: {} from task '{}' (rejected by {})",
                    index,
                    task,
                    fields.join(", ")
                ));
            }
            for (index, _) in rejected.iter().rev() {
                self.remove_annotation_in(&task, *index)?;
            }
            if !rejected.is_empty() {
                debug!(task = %task, removed = rejected.len(), "removed invalid annotations");
            }

            report
                .removed
                .extend(rejected.into_iter().map(|(index, fields)| RemovedAnnotation {
                    task: task.clone(),
                    index,
                    fields,
                }));
            report.validity.insert(task, validity);
        }

        report.messages = sink.lines().to_vec();
        Ok(report)
    }
}

/// Autofixes every record in order, dropping the ones that abort.
///
/// # Errors
/// Only errors that are not record-fatal aborts stop the batch.
pub fn autofix_batch(
    records: Vec<Record>,
    tools: &Collaborators,
) -> Result<(Vec<Record>, BatchReport), RecordError> {
    let mut kept = Vec::with_capacity(records.len());
    let mut batch = BatchReport::default();

    for (position, mut record) in records.into_iter().enumerate() {
        match record.autofix(tools) {
            Ok(report) => {
                kept.push(record);
                batch.reports.push(report);
            }
            Err(err) if err.is_autofix_abort() => {
                warn!(
                    "Record could not be autofixed and will be removed because: {}",
                    err
                );
                batch.dropped.push(DroppedRecord {
                    position,
                    imageid: record.imageid(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    Ok((kept, batch))
}

/// [`autofix_batch`] without the report.
pub fn autofix_records(
    records: Vec<Record>,
    tools: &Collaborators,
) -> Result<Vec<Record>, RecordError> {
    autofix_batch(records, tools).map(|(records, _)| records)
}
