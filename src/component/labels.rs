//! Class maps and per-object labels.

use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;

use super::{from_value, to_value, Attr, Component, FieldValidity, Peers};
use crate::autofix::ReportSink;
use crate::error::RecordError;
use crate::ir::{ClassId, ClassMap, Collaborators};
use crate::registry::{ComponentKind, KindId, RECORD_COMPONENT};
use crate::task::Task;

fn describe_class_map(class_map: &Option<ClassMap>) -> String {
    match class_map {
        Some(class_map) => format!("Class Map: {:?}", class_map.names()),
        None => "Class Map: None".to_string(),
    }
}

fn ids_to_names(class_map: Option<&ClassMap>, ids: &[ClassId]) -> Result<Vec<String>, RecordError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let class_map = class_map.ok_or(RecordError::MissingClassMap)?;
    ids.iter()
        .map(|&id| {
            class_map
                .get_by_id(id)
                .map(str::to_string)
                .ok_or(RecordError::UnknownClassId(id))
        })
        .collect()
}

/// The class map of a task, with no labels attached.
#[derive(Clone, Debug)]
pub struct ClassMapComponent {
    task: Task,
    class_map: Option<ClassMap>,
}

impl ClassMapComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("ClassMapComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            class_map: None,
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_class_map(&mut self, class_map: ClassMap) {
        self.class_map = Some(class_map);
    }

    pub fn class_map(&self) -> Option<&ClassMap> {
        self.class_map.as_ref()
    }
}

impl Default for ClassMapComponent {
    fn default() -> Self {
        Self::new(Task::detect())
    }
}

impl Component for ClassMapComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "classmap"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::ClassMap]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::ClassMap => Some(to_value(&self.class_map)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::ClassMap => {
                self.class_map = from_value(attr, value)?;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::ClassMap => {
                self.class_map = None;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn describe(&self) -> Vec<String> {
        vec![describe_class_map(&self.class_map)]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["set_class_map(<ClassMap>)".to_string()]
    }

    fn clone_box(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-object class labels, kept both as ids and as names.
///
/// The component carries its own class map to translate between the two.
/// Setting names grows the class map as needed; setting ids requires every id
/// to be known already.
#[derive(Clone, Debug)]
pub struct LabelsComponent {
    task: Task,
    class_map: Option<ClassMap>,
    labels: Vec<ClassId>,
    labels_names: Vec<String>,
}

impl LabelsComponent {
    pub const KIND: ComponentKind = ComponentKind::new(
        KindId::new("LabelsComponent"),
        &[ClassMapComponent::KIND.id, RECORD_COMPONENT],
    )
    .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            class_map: None,
            labels: Vec::new(),
            labels_names: Vec::new(),
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    /// Replaces the class map and renames every label through it.
    ///
    /// # Errors
    /// [`RecordError::UnknownClassId`] if a current label id is not in
    /// `class_map`; the old map and names are kept.
    pub fn set_class_map(&mut self, class_map: ClassMap) -> Result<(), RecordError> {
        let names = ids_to_names(Some(&class_map), &self.labels)?;
        self.class_map = Some(class_map);
        self.labels_names = names;
        Ok(())
    }

    pub fn class_map(&self) -> Option<&ClassMap> {
        self.class_map.as_ref()
    }

    pub fn labels(&self) -> &[ClassId] {
        &self.labels
    }

    pub fn labels_names(&self) -> &[String] {
        &self.labels_names
    }

    pub fn set_labels(&mut self, labels: &[ClassId]) -> Result<(), RecordError> {
        let names = self.ids_to_names(labels)?;
        self.labels = labels.to_vec();
        self.labels_names = names;
        Ok(())
    }

    pub fn add_labels(&mut self, labels: &[ClassId]) -> Result<(), RecordError> {
        let names = self.ids_to_names(labels)?;
        self.labels.extend_from_slice(labels);
        self.labels_names.extend(names);
        Ok(())
    }

    pub fn set_labels_names<S: AsRef<str>>(&mut self, names: &[S]) {
        self.labels.clear();
        self.labels_names.clear();
        self.add_labels_names(names);
    }

    pub fn add_labels_names<S: AsRef<str>>(&mut self, names: &[S]) {
        let class_map = self
            .class_map
            .get_or_insert_with(|| ClassMap::with_background(Vec::<String>::new()));
        for name in names {
            let name = name.as_ref();
            self.labels.push(class_map.add_name(name));
            self.labels_names.push(name.to_string());
        }
    }

    fn ids_to_names(&self, ids: &[ClassId]) -> Result<Vec<String>, RecordError> {
        ids_to_names(self.class_map.as_ref(), ids)
    }
}

impl Default for LabelsComponent {
    fn default() -> Self {
        Self::new(Task::detect())
    }
}

impl Component for LabelsComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "label"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::ClassMap, Attr::Labels, Attr::LabelNames]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::ClassMap => Some(to_value(&self.class_map)),
            Attr::Labels => Some(to_value(&self.labels)),
            Attr::LabelNames => Some(to_value(&self.labels_names)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::ClassMap => {
                let class_map: Option<ClassMap> = from_value(attr, value)?;
                match class_map {
                    Some(class_map) => self.set_class_map(class_map)?,
                    None => self.clear(attr)?,
                }
            }
            Attr::Labels => {
                let labels: Vec<ClassId> = from_value(attr, value)?;
                self.set_labels(&labels)?;
            }
            Attr::LabelNames => {
                let names: Vec<String> = from_value(attr, value)?;
                self.set_labels_names(&names);
            }
            _ => return Err(RecordError::ReadOnly(attr)),
        }
        Ok(())
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::ClassMap => {
                if !self.labels.is_empty() {
                    return Err(RecordError::MissingClassMap);
                }
                self.class_map = None;
            }
            Attr::Labels | Attr::LabelNames => {
                self.labels.clear();
                self.labels_names.clear();
            }
            _ => return Err(RecordError::ReadOnly(attr)),
        }
        Ok(())
    }

    // The class map is shared configuration, not per-record data.
    fn serialize(&self) -> serde_json::Map<String, Value> {
        [Attr::Labels, Attr::LabelNames]
            .into_iter()
            .filter_map(|attr| self.read(attr).map(|value| (attr.key().to_string(), value)))
            .collect()
    }

    fn num_annotations(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([("labels".to_string(), self.labels.len())])
    }

    fn autofix(
        &mut self,
        _peers: &Peers<'_>,
        _tools: &Collaborators,
        _sink: &mut ReportSink,
    ) -> Result<FieldValidity, RecordError> {
        Ok(FieldValidity::from([(
            "labels".to_string(),
            vec![true; self.labels.len()],
        )]))
    }

    fn remove_annotation(&mut self, index: usize) {
        if index < self.labels.len() {
            self.labels.remove(index);
        }
        if index < self.labels_names.len() {
            self.labels_names.remove(index);
        }
    }

    fn aggregate_objects(&self) -> BTreeMap<String, Vec<Value>> {
        let labels = self.labels.iter().map(to_value).collect();
        BTreeMap::from([("labels".to_string(), labels)])
    }

    fn describe(&self) -> Vec<String> {
        vec![
            describe_class_map(&self.class_map),
            format!("Labels: {:?}", self.labels_names),
        ]
    }

    fn builder_template(&self) -> Vec<String> {
        vec![
            "set_class_map(<ClassMap>)".to_string(),
            "add_labels_names(<&[&str]>)".to_string(),
        ]
    }

    fn clone_box(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
