//! Records: one annotated image, split into per-task composites.
//!
//! A [`Record`] always has a composite for the default task, which carries the
//! base components (image id and size). Components of any other task live in
//! their own composite, and lookups that miss there fall through to the
//! default composite. Task-unqualified accessors address the default
//! composite; the `_in` variants address a named task.

mod blueprint;
mod view;

pub use blueprint::Blueprint;

use serde_json::{Map, Value};
use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;

use crate::component::{Attr, Component, ImageIdComponent, Peers, SizeComponent};
use crate::composite::{Composite, Merge};
use crate::error::RecordError;
use crate::ir::{Collaborators, ImageId};
use crate::registry::{Registry, RECORD_COMPONENT};
use crate::task::Task;

/// Record construction settings.
#[derive(Clone, Debug, Default)]
pub struct RecordConfig {
    /// Task whose composite receives the base components and answers
    /// task-unqualified lookups.
    pub default_task: Task,
}

impl RecordConfig {
    pub fn with_default_task(mut self, task: Task) -> Self {
        self.default_task = task;
        self
    }
}

/// One annotated image.
#[derive(Clone, Debug)]
pub struct Record {
    config: RecordConfig,
    default: Composite,
    others: Vec<Composite>,
}

fn base_components(task: &Task) -> Vec<Box<dyn Component>> {
    vec![
        Box::new(ImageIdComponent::new(task.clone())),
        Box::new(SizeComponent::new(task.clone())),
    ]
}

/// Groups components by task, keeping the first-seen `Task` value per name.
fn group_by_task(components: Vec<Box<dyn Component>>) -> Vec<(Task, Vec<Box<dyn Component>>)> {
    let mut groups: Vec<(Task, Vec<Box<dyn Component>>)> = Vec::new();
    for component in components {
        match groups.iter().position(|(task, _)| task == component.task()) {
            Some(index) => groups[index].1.push(component),
            None => groups.push((component.task().clone(), vec![component])),
        }
    }
    groups
}

fn short_type_name<T>() -> &'static str {
    let name = type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

impl Record {
    /// Builds a record with the default configuration.
    pub fn new(components: Vec<Box<dyn Component>>) -> Result<Self, RecordError> {
        Self::with_config(RecordConfig::default(), components)
    }

    /// Builds a record; the base components are unioned into the default task.
    ///
    /// # Errors
    /// [`RecordError::DuplicateCapability`] if a task receives two components
    /// of the same capability.
    pub fn with_config(
        config: RecordConfig,
        components: Vec<Box<dyn Component>>,
    ) -> Result<Self, RecordError> {
        let default_task = config.default_task.clone();
        let mut default_group = Vec::new();
        let mut others = Vec::new();

        for (task, group) in group_by_task(components) {
            if task == default_task {
                default_group = group;
            } else {
                others.push(Composite::new(task, group, Vec::new())?);
            }
        }
        others.sort_by(|a, b| a.task().cmp_order(b.task()));

        let base = base_components(&default_task);
        let default = Composite::new(default_task, default_group, base)?;

        Ok(Self {
            config,
            default,
            others,
        })
    }

    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// Unions more components into the record, creating task composites as
    /// needed. Capabilities already present in a task are skipped.
    pub fn add_components(&mut self, components: Vec<Box<dyn Component>>) -> Result<(), RecordError> {
        for (task, group) in group_by_task(components) {
            if &task == self.default.task() {
                self.default.add_components(group)?;
            } else if let Some(index) = self.others.iter().position(|c| c.task() == &task) {
                self.others[index].add_components(group)?;
            } else {
                self.others.push(Composite::new(task, group, Vec::new())?);
                self.others.sort_by(|a, b| a.task().cmp_order(b.task()));
            }
        }
        Ok(())
    }

    pub fn default_composite(&self) -> &Composite {
        &self.default
    }

    /// Composites in iteration order: the default task first, then the others
    /// by task order.
    pub fn composites(&self) -> impl Iterator<Item = &Composite> {
        std::iter::once(&self.default).chain(self.others.iter())
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.composites().map(Composite::task)
    }

    pub fn composite(&self, task: &str) -> Option<&Composite> {
        self.composites().find(|c| c.task().name() == task)
    }

    pub fn composite_mut(&mut self, task: &str) -> Option<&mut Composite> {
        if self.default.task().name() == task {
            return Some(&mut self.default);
        }
        self.others.iter_mut().find(|c| c.task().name() == task)
    }

    fn require(&self, task: &str) -> Result<&Composite, RecordError> {
        self.composite(task)
            .ok_or_else(|| RecordError::UnknownTask(task.to_string()))
    }

    fn parent_for(&self, task: &str) -> Option<&Composite> {
        (self.default.task().name() != task).then_some(&self.default)
    }

    /// Task-unqualified lookup in the default composite.
    pub fn resolve(&self, attr: Attr) -> Result<&dyn Component, RecordError> {
        self.default.resolve(attr, None)
    }

    /// Lookup in `task`, falling back to the default composite.
    pub fn resolve_in(&self, task: &str, attr: Attr) -> Result<&dyn Component, RecordError> {
        self.require(task)?.resolve(attr, self.parent_for(task))
    }

    pub fn get(&self, attr: Attr) -> Result<Value, RecordError> {
        let component = self.resolve(attr)?;
        component
            .read(attr)
            .ok_or_else(|| RecordError::AttributeResolution {
                attr,
                task: self.default.task().name().to_string(),
            })
    }

    pub fn get_in(&self, task: &str, attr: Attr) -> Result<Value, RecordError> {
        let component = self.resolve_in(task, attr)?;
        component
            .read(attr)
            .ok_or_else(|| RecordError::AttributeResolution {
                attr,
                task: task.to_string(),
            })
    }

    /// Routes `value` to the setter of the default-task component exposing
    /// `attr`.
    pub fn set(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        let task = self.default.task().name().to_string();
        self.default
            .resolve_local_mut(attr)
            .ok_or(RecordError::AttributeResolution { attr, task })?
            .assign(attr, value)
    }

    pub fn set_in(&mut self, task: &str, attr: Attr, value: Value) -> Result<(), RecordError> {
        let composite = self
            .composite_mut(task)
            .ok_or_else(|| RecordError::UnknownTask(task.to_string()))?;
        composite
            .resolve_local_mut(attr)
            .ok_or_else(|| RecordError::AttributeResolution {
                attr,
                task: task.to_string(),
            })?
            .assign(attr, value)
    }

    pub fn find<T: Component + 'static>(&self) -> Option<&T> {
        self.default.find::<T>()
    }

    pub fn find_mut<T: Component + 'static>(&mut self) -> Option<&mut T> {
        self.default.find_mut::<T>()
    }

    /// First `T` in `task`, falling back to the default composite.
    pub fn find_in<T: Component + 'static>(&self, task: &str) -> Option<&T> {
        self.composite(task)?
            .find::<T>()
            .or_else(|| self.parent_for(task).and_then(|parent| parent.find::<T>()))
    }

    pub fn find_in_mut<T: Component + 'static>(&mut self, task: &str) -> Option<&mut T> {
        if self.default.task().name() == task {
            return self.default.find_mut::<T>();
        }
        let composite = self.others.iter_mut().find(|c| c.task().name() == task)?;
        if composite.find::<T>().is_some() {
            return composite.find_mut::<T>();
        }
        self.default.find_mut::<T>()
    }

    fn missing<T>(&self, task: &str) -> RecordError {
        RecordError::MissingComponent {
            component: short_type_name::<T>().to_string(),
            task: task.to_string(),
        }
    }

    pub fn component<T: Component + 'static>(&self) -> Result<&T, RecordError> {
        self.find::<T>()
            .ok_or_else(|| self.missing::<T>(self.default.task().name()))
    }

    pub fn component_mut<T: Component + 'static>(&mut self) -> Result<&mut T, RecordError> {
        let err = self.missing::<T>(self.default.task().name());
        self.find_mut::<T>().ok_or(err)
    }

    pub fn component_in<T: Component + 'static>(&self, task: &str) -> Result<&T, RecordError> {
        self.require(task)?;
        self.find_in::<T>(task)
            .ok_or_else(|| self.missing::<T>(task))
    }

    pub fn component_in_mut<T: Component + 'static>(
        &mut self,
        task: &str,
    ) -> Result<&mut T, RecordError> {
        self.require(task)?;
        let err = self.missing::<T>(task);
        self.find_in_mut::<T>(task).ok_or(err)
    }

    pub fn imageid(&self) -> Option<ImageId> {
        self.find::<ImageIdComponent>()
            .and_then(ImageIdComponent::imageid)
    }

    /// Runs `op` over every task composite; one `(task, results)` entry per
    /// task, default first.
    pub fn reduce_by_task<R>(&self, mut op: impl FnMut(&dyn Component) -> R) -> Vec<(String, Vec<R>)> {
        self.composites()
            .map(|composite| (composite.task().name().to_string(), composite.reduce(&mut op)))
            .collect()
    }

    pub fn reduce_merged_by_task<R: Merge + Default>(
        &self,
        mut op: impl FnMut(&dyn Component) -> R,
    ) -> Vec<(String, R)> {
        self.composites()
            .map(|composite| {
                let merged = composite.reduce_merged(&mut op);
                (composite.task().name().to_string(), merged)
            })
            .collect()
    }

    /// Mutable fan-out. Non-default composites see the default composite as
    /// the parent of their [`Peers`] view.
    pub fn reduce_mut_by_task<R>(
        &mut self,
        mut op: impl FnMut(&mut dyn Component, &mut Peers<'_>) -> R,
    ) -> Vec<(String, Vec<R>)> {
        let mut results = Vec::with_capacity(1 + self.others.len());
        let name = self.default.task().name().to_string();
        results.push((name, self.default.reduce_mut(None, &mut op)));
        for composite in &mut self.others {
            let name = composite.task().name().to_string();
            let reduced = composite.reduce_mut(Some(&mut self.default), &mut op);
            results.push((name, reduced));
        }
        results
    }

    /// Flat key/value snapshot of the default composite.
    pub fn serialize(&self) -> Map<String, Value> {
        self.default.serialize()
    }

    pub fn serialize_in(&self, task: &str) -> Result<Map<String, Value>, RecordError> {
        Ok(self.require(task)?.serialize())
    }

    pub fn serialize_by_task(&self) -> Vec<(String, Map<String, Value>)> {
        self.reduce_merged_by_task(|component| component.serialize())
    }

    /// Annotation count per field, keyed by task.
    pub fn num_annotations(&self) -> BTreeMap<String, BTreeMap<String, usize>> {
        self.reduce_merged_by_task(|component| component.num_annotations())
            .into_iter()
            .collect()
    }

    pub fn num_annotations_in(&self, task: &str) -> Result<BTreeMap<String, usize>, RecordError> {
        Ok(self.require(task)?.num_annotations())
    }

    /// Removes annotation `index` from every field of every task.
    pub fn remove_annotation(&mut self, index: usize) {
        self.default.remove_annotation(index);
        for composite in &mut self.others {
            composite.remove_annotation(index);
        }
    }

    pub fn remove_annotation_in(&mut self, task: &str, index: usize) -> Result<(), RecordError> {
        self.composite_mut(task)
            .ok_or_else(|| RecordError::UnknownTask(task.to_string()))?
            .remove_annotation(index);
        Ok(())
    }

    /// Returns a copy with heavy payload materialized; `self` is untouched.
    pub fn load(&self, tools: &Collaborators) -> Result<Record, RecordError> {
        let mut record = self.clone();
        let results = record.reduce_mut_by_task(|component, peers| component.load(peers, tools));
        for (_, task_results) in results {
            task_results.into_iter().collect::<Result<Vec<()>, _>>()?;
        }
        Ok(record)
    }

    /// Drops heavy payload in place.
    pub fn unload(&mut self) {
        self.default.unload();
        for composite in &mut self.others {
            composite.unload();
        }
    }

    /// Per-object values keyed by task, then field.
    ///
    /// Tasks stay apart so that each task's lists remain index-aligned with
    /// its own annotations.
    pub fn aggregate_objects(&self) -> BTreeMap<String, BTreeMap<String, Vec<Value>>> {
        self.reduce_merged_by_task(|component| component.aggregate_objects())
            .into_iter()
            .collect()
    }

    /// Diagnostic lines; lines of non-default tasks carry a `[task]` prefix.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = self.default.describe();
        for composite in &self.others {
            let task = composite.task();
            lines.extend(
                composite
                    .describe()
                    .into_iter()
                    .map(|line| format!("[{}] {}", task, line)),
            );
        }
        lines
    }

    /// Rust statements that would fill every component of this record.
    pub fn builder_template(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for composite in self.composites() {
            let qualified = composite.task() != self.default.task();
            for component in composite.components() {
                let kind = component.kind();
                for call in component.builder_template() {
                    let line = if qualified {
                        format!(
                            "record.component_in_mut::<{}>(\"{}\")?.{};",
                            kind,
                            composite.task(),
                            call
                        )
                    } else {
                        format!("record.component_mut::<{}>()?.{};", kind, call)
                    };
                    lines.push(line);
                }
            }
        }
        lines
    }

    /// An empty record with the same capabilities per task, built from the
    /// kinds `registry` resolves for this record's components.
    pub fn blank_like(&self, registry: &Registry) -> Result<Record, RecordError> {
        let mut components: Vec<Box<dyn Component>> = Vec::new();
        for composite in self.composites() {
            let present: Vec<&dyn Component> =
                composite.components().iter().map(|c| c.as_ref()).collect();
            let mut seen: Vec<&str> = Vec::new();
            for kind in registry.resolve(RECORD_COMPONENT, &present) {
                let Some(capability) = registry.capability_of(kind.id) else {
                    continue;
                };
                if seen.contains(&capability) {
                    continue;
                }
                if let Some(component) = kind.construct(Some(composite.task().clone())) {
                    seen.push(capability);
                    components.push(component);
                }
            }
        }
        Record::with_config(self.config.clone(), components)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record:")?;
        for line in self.describe() {
            write!(f, "\n\t- {}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{BBoxesComponent, LabelsComponent, MasksComponent};
    use crate::ir::BBox;
    use serde_json::json;

    fn detection_record() -> Record {
        let mut record = Record::new(vec![
            Box::new(BBoxesComponent::default()),
            Box::new(LabelsComponent::default()),
        ])
        .unwrap();
        record.component_mut::<ImageIdComponent>().unwrap().set_imageid(7u64);
        record
            .component_mut::<SizeComponent>()
            .unwrap()
            .set_image_size(100, 50);
        record
            .component_in_mut::<BBoxesComponent>(Task::DETECT)
            .unwrap()
            .add_bboxes([BBox::from_xyxy(1.0, 1.0, 10.0, 10.0)]);
        record
            .component_in_mut::<LabelsComponent>(Task::DETECT)
            .unwrap()
            .add_labels_names(&["cat"]);
        record
    }

    #[test]
    fn test_base_components_always_present() {
        let record = Record::new(Vec::new()).unwrap();
        let names: Vec<_> = record.default_composite().capabilities().collect();
        assert_eq!(names, vec!["imageid", "size"]);
        assert_eq!(record.tasks().count(), 1);
    }

    #[test]
    fn test_task_lookup_falls_back_to_default() {
        let record = detection_record();
        assert_eq!(record.get_in(Task::DETECT, Attr::Width).unwrap(), json!(100));
        assert!(record.find_in::<SizeComponent>(Task::DETECT).is_some());
        assert!(matches!(
            record.resolve(Attr::BBoxes),
            Err(RecordError::AttributeResolution { .. })
        ));
        assert!(matches!(
            record.get_in("segment", Attr::Masks),
            Err(RecordError::UnknownTask(_))
        ));
    }

    #[test]
    fn test_num_annotations_by_task() {
        let record = detection_record();
        let counts = record.num_annotations();
        assert_eq!(counts["detect"]["bboxes"], 1);
        assert_eq!(counts["detect"]["labels"], 1);
        assert!(counts["default"].is_empty());
    }

    #[test]
    fn test_missing_component_error_names_type() {
        let record = detection_record();
        let err = record.component_in::<MasksComponent>(Task::DETECT).unwrap_err();
        assert!(matches!(
            err,
            RecordError::MissingComponent { component, .. } if component == "MasksComponent"
        ));
    }

    #[test]
    fn test_builder_template_qualifies_tasks() {
        let record = detection_record();
        let template = record.builder_template();
        assert!(template.contains(&"record.component_mut::<ImageIdComponent>()?.set_imageid(<u64>);".to_string()));
        assert!(template.contains(
            &"record.component_in_mut::<BBoxesComponent>(\"detect\")?.add_bboxes(<Vec<BBox>>);"
                .to_string()
        ));
    }

    #[test]
    fn test_blank_like_keeps_capabilities() {
        let registry = Registry::builtin().unwrap();
        let record = detection_record();
        let blank = record.blank_like(&registry).unwrap();

        let names: Vec<_> = blank.composite("detect").unwrap().capabilities().collect();
        assert_eq!(names, vec!["bbox", "label"]);
        assert_eq!(blank.imageid(), None);
        assert_eq!(blank.num_annotations()["detect"]["bboxes"], 0);
    }

    #[test]
    fn test_display_lists_components() {
        let text = detection_record().to_string();
        assert!(text.starts_with("Record:"));
        assert!(text.contains("\t- Image ID: 7"));
        assert!(text.contains("[detect] Labels: [\"cat\"]"));
    }
}
