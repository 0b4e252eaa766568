use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::component::Attr;
use crate::ir::ClassId;

/// The main error type for record operations.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Capability '{0}' is already registered")]
    RegistrationConflict(String),

    #[error("Capability '{0}' has not been declared")]
    UnknownCapability(String),

    #[error("Component kind {kind} is already registered under '{capability}'")]
    KindAlreadyRegistered { kind: String, capability: String },

    #[error("Duplicate '{capability}' component for task '{task}'")]
    DuplicateCapability { capability: String, task: String },

    #[error("Component for task '{found}' cannot join the composite for task '{expected}'")]
    TaskMismatch { expected: String, found: String },

    #[error("No component provides '{attr}' (looked up from task '{task}')")]
    AttributeResolution { attr: Attr, task: String },

    #[error("No {component} in task '{task}'")]
    MissingComponent { component: String, task: String },

    #[error("Record has no task '{0}'")]
    UnknownTask(String),

    #[error(
        "Number of items should be the same for each annotation type in task '{task}', but got: {}",
        format_counts(.counts)
    )]
    AnnotationAlignment {
        task: String,
        counts: BTreeMap<String, usize>,
    },

    #[error("Autofix aborted: {0}")]
    AutofixAbort(String),

    #[error("Record has no key '{0}'")]
    UnknownKey(String),

    #[error("'{0}' cannot be assigned or deleted")]
    ReadOnly(Attr),

    #[error("Invalid value for '{attr}': {source}")]
    InvalidValue {
        attr: Attr,
        #[source]
        source: serde_json::Error,
    },

    #[error("Labels need a class map to translate between ids and names")]
    MissingClassMap,

    #[error("Class id {0} is not in the class map")]
    UnknownClassId(ClassId),

    #[error("Class '{0}' is not in the class map")]
    UnknownClassName(String),

    #[error("Encoded mask covers {found} pixels, expected {expected}")]
    MaskDecode { expected: u64, found: u64 },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageFormat {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },
}

impl RecordError {
    /// Errors that reject a whole record during autofix.
    pub fn is_autofix_abort(&self) -> bool {
        matches!(
            self,
            RecordError::AnnotationAlignment { .. } | RecordError::AutofixAbort(_)
        )
    }
}

fn format_counts(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(field, count)| format!("{} for {}", count, field))
        .collect::<Vec<_>>()
        .join(", ")
}
