//! Declarative record layouts resolved through a [`Registry`].

use super::{Record, RecordConfig};
use crate::component::Component;
use crate::error::RecordError;
use crate::registry::{Registry, RECORD_COMPONENT};
use crate::task::Task;

/// An ordered list of requested capabilities, each optionally pinned to a
/// task. Unpinned capabilities use their component's own default task.
///
/// ```
/// use annorecord::{Blueprint, Registry, RecordConfig, Task};
///
/// let registry = Registry::builtin()?;
/// let record = Blueprint::new()
///     .with("filepath")
///     .with("bbox")
///     .with_task("mask", Task::segment())
///     .build(&registry, RecordConfig::default())?;
/// assert_eq!(record.tasks().count(), 3);
/// # Ok::<(), annorecord::RecordError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Blueprint {
    entries: Vec<(String, Option<Task>)>,
}

impl Blueprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: impl Into<String>) -> Self {
        self.entries.push((capability.into(), None));
        self
    }

    pub fn with_task(mut self, capability: impl Into<String>, task: Task) -> Self {
        self.entries.push((capability.into(), Some(task)));
        self
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Constructs one component per entry and assembles the record.
    ///
    /// # Errors
    /// [`RecordError::UnknownCapability`] if a capability has no constructible
    /// record component, plus any error of [`Record::with_config`].
    pub fn build(&self, registry: &Registry, config: RecordConfig) -> Result<Record, RecordError> {
        let mut components: Vec<Box<dyn Component>> = Vec::with_capacity(self.entries.len());
        for (capability, task) in &self.entries {
            let kind = registry.constructor(capability, RECORD_COMPONENT)?;
            let component = kind
                .construct(task.clone())
                .ok_or_else(|| RecordError::UnknownCapability(capability.clone()))?;
            components.push(component);
        }
        Record::with_config(config, components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{BBoxesComponent, MasksComponent};

    #[test]
    fn test_build_places_components_by_task() {
        let registry = Registry::builtin().unwrap();
        let record = Blueprint::new()
            .with("bbox")
            .with_task("mask", Task::segment())
            .build(&registry, RecordConfig::default())
            .unwrap();

        assert!(record.find_in::<BBoxesComponent>(Task::DETECT).is_some());
        assert!(record.find_in::<MasksComponent>(Task::SEGMENT).is_some());
        assert!(record.find_in::<MasksComponent>(Task::DETECT).is_none());
    }

    #[test]
    fn test_unknown_capability() {
        let registry = Registry::builtin().unwrap();
        let err = Blueprint::new()
            .with("polygon")
            .build(&registry, RecordConfig::default())
            .unwrap_err();
        assert!(matches!(err, RecordError::UnknownCapability(name) if name == "polygon"));
    }

    #[test]
    fn test_repeated_capability_is_rejected() {
        let registry = Registry::builtin().unwrap();
        let err = Blueprint::new()
            .with("bbox")
            .with("bbox")
            .build(&registry, RecordConfig::default())
            .unwrap_err();
        assert!(matches!(err, RecordError::DuplicateCapability { .. }));
    }
}
