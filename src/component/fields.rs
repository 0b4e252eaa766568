//! Simple per-object value lists: areas, crowd flags, keypoints and scores.

use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;

use super::{from_value, to_value, Attr, Component};
use crate::error::RecordError;
use crate::ir::KeyPoints;
use crate::registry::{ComponentKind, KindId, RECORD_COMPONENT};
use crate::task::Task;

fn remove_at<T>(values: &mut Vec<T>, index: usize) {
    if index < values.len() {
        values.remove(index);
    }
}

/// Per-object areas, as reported by the source dataset.
#[derive(Clone, Debug)]
pub struct AreasComponent {
    task: Task,
    areas: Vec<f64>,
}

impl AreasComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("AreasComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            areas: Vec::new(),
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_areas(&mut self, areas: Vec<f64>) {
        self.areas = areas;
    }

    pub fn add_areas(&mut self, areas: impl IntoIterator<Item = f64>) {
        self.areas.extend(areas);
    }

    pub fn areas(&self) -> &[f64] {
        &self.areas
    }
}

impl Default for AreasComponent {
    fn default() -> Self {
        Self::new(Task::detect())
    }
}

impl Component for AreasComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "area"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::Areas]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::Areas => Some(to_value(&self.areas)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::Areas => {
                self.areas = from_value(attr, value)?;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::Areas => {
                self.areas.clear();
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn num_annotations(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([("areas".to_string(), self.areas.len())])
    }

    fn remove_annotation(&mut self, index: usize) {
        remove_at(&mut self.areas, index);
    }

    fn describe(&self) -> Vec<String> {
        vec![format!("Areas: {:?}", self.areas)]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["add_areas(<Vec<f64>>)".to_string()]
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

/// Per-object COCO `iscrowd` flags.
#[derive(Clone, Debug)]
pub struct IsCrowdsComponent {
    task: Task,
    iscrowds: Vec<bool>,
}

impl IsCrowdsComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("IsCrowdsComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            iscrowds: Vec::new(),
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_iscrowds(&mut self, iscrowds: Vec<bool>) {
        self.iscrowds = iscrowds;
    }

    pub fn add_iscrowds(&mut self, iscrowds: impl IntoIterator<Item = bool>) {
        self.iscrowds.extend(iscrowds);
    }

    pub fn iscrowds(&self) -> &[bool] {
        &self.iscrowds
    }
}

impl Default for IsCrowdsComponent {
    fn default() -> Self {
        Self::new(Task::detect())
    }
}

impl Component for IsCrowdsComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "iscrowd"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::IsCrowds]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::IsCrowds => Some(to_value(&self.iscrowds)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::IsCrowds => {
                self.iscrowds = from_value(attr, value)?;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::IsCrowds => {
                self.iscrowds.clear();
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn num_annotations(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([("iscrowds".to_string(), self.iscrowds.len())])
    }

    fn remove_annotation(&mut self, index: usize) {
        remove_at(&mut self.iscrowds, index);
    }

    fn aggregate_objects(&self) -> BTreeMap<String, Vec<Value>> {
        let flags = self.iscrowds.iter().map(|&flag| Value::Bool(flag)).collect();
        BTreeMap::from([("iscrowds".to_string(), flags)])
    }

    fn describe(&self) -> Vec<String> {
        vec![format!("Is Crowds: {:?}", self.iscrowds)]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["add_iscrowds(<Vec<bool>>)".to_string()]
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

/// Keypoints, one [`KeyPoints`] list per object.
#[derive(Clone, Debug)]
pub struct KeyPointsComponent {
    task: Task,
    keypoints: Vec<KeyPoints>,
}

impl KeyPointsComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("KeyPointsComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            keypoints: Vec::new(),
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_keypoints(&mut self, keypoints: Vec<KeyPoints>) {
        self.keypoints = keypoints;
    }

    pub fn add_keypoints(&mut self, keypoints: impl IntoIterator<Item = KeyPoints>) {
        self.keypoints.extend(keypoints);
    }

    pub fn keypoints(&self) -> &[KeyPoints] {
        &self.keypoints
    }
}

impl Default for KeyPointsComponent {
    fn default() -> Self {
        Self::new(Task::detect())
    }
}

impl Component for KeyPointsComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "keypoint"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::KeyPoints]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::KeyPoints => Some(to_value(&self.keypoints)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::KeyPoints => {
                self.keypoints = from_value(attr, value)?;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::KeyPoints => {
                self.keypoints.clear();
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn num_annotations(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([("keypoints".to_string(), self.keypoints.len())])
    }

    fn remove_annotation(&mut self, index: usize) {
        remove_at(&mut self.keypoints, index);
    }

    fn aggregate_objects(&self) -> BTreeMap<String, Vec<Value>> {
        let objects = self
            .keypoints
            .iter()
            .map(|kpts| {
                let xs: Vec<f64> = kpts.points.iter().map(|kpt| kpt.x).collect();
                let ys: Vec<f64> = kpts.points.iter().map(|kpt| kpt.y).collect();
                let visible: Vec<u8> = kpts.points.iter().map(|kpt| kpt.visible).collect();
                json!({
                    "keypoint_x": xs,
                    "keypoint_y": ys,
                    "keypoint_visible": visible,
                })
            })
            .collect();
        BTreeMap::from([("keypoints".to_string(), objects)])
    }

    fn describe(&self) -> Vec<String> {
        let counts: Vec<usize> = self.keypoints.iter().map(|k| k.points.len()).collect();
        vec![format!("KeyPoints: {} objects, points per object {:?}", counts.len(), counts)]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["add_keypoints(<Vec<KeyPoints>>)".to_string()]
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

/// Per-object prediction scores.
#[derive(Clone, Debug)]
pub struct ScoresComponent {
    task: Task,
    scores: Vec<f64>,
}

impl ScoresComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("ScoresComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            scores: Vec::new(),
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_scores(&mut self, scores: Vec<f64>) {
        self.scores = scores;
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }
}

impl Default for ScoresComponent {
    fn default() -> Self {
        Self::new(Task::detect())
    }
}

impl Component for ScoresComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "score"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::Scores]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::Scores => Some(to_value(&self.scores)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::Scores => {
                self.scores = from_value(attr, value)?;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::Scores => {
                self.scores.clear();
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn num_annotations(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([("scores".to_string(), self.scores.len())])
    }

    fn remove_annotation(&mut self, index: usize) {
        remove_at(&mut self.scores, index);
    }

    fn describe(&self) -> Vec<String> {
        vec![format!("Scores: {:?}", self.scores)]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["set_scores(<Vec<f64>>)".to_string()]
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
