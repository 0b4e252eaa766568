//! Per-object bounding boxes.

use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;

use super::{from_value, to_value, Attr, Component, FieldValidity, Peers};
use crate::autofix::ReportSink;
use crate::error::RecordError;
use crate::ir::{BBox, Collaborators};
use crate::registry::{ComponentKind, KindId, RECORD_COMPONENT};
use crate::task::Task;

/// One box per annotated object, in pixel XYXY coordinates.
#[derive(Clone, Debug)]
pub struct BBoxesComponent {
    task: Task,
    bboxes: Vec<BBox>,
}

impl BBoxesComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("BBoxesComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            bboxes: Vec::new(),
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_bboxes(&mut self, bboxes: Vec<BBox>) {
        self.bboxes = bboxes;
    }

    pub fn add_bboxes(&mut self, bboxes: impl IntoIterator<Item = BBox>) {
        self.bboxes.extend(bboxes);
    }

    pub fn bboxes(&self) -> &[BBox] {
        &self.bboxes
    }
}

impl Default for BBoxesComponent {
    fn default() -> Self {
        Self::new(Task::detect())
    }
}

impl Component for BBoxesComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "bbox"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::BBoxes]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::BBoxes => Some(to_value(&self.bboxes)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::BBoxes => {
                self.bboxes = from_value(attr, value)?;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::BBoxes => {
                self.bboxes.clear();
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn num_annotations(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([("bboxes".to_string(), self.bboxes.len())])
    }

    /// Clamps every box to the image; boxes that cannot be repaired are
    /// marked invalid. Without a known image size the record is rejected.
    fn autofix(
        &mut self,
        peers: &Peers<'_>,
        tools: &Collaborators,
        sink: &mut ReportSink,
    ) -> Result<FieldValidity, RecordError> {
        let (width, height) = peers.image_size().ok_or_else(|| {
            RecordError::AutofixAbort("image size is required to autofix bboxes".to_string())
        })?;

        let mut valid = Vec::with_capacity(self.bboxes.len());
        for (index, bbox) in self.bboxes.iter_mut().enumerate() {
            match tools.geometry.validate_and_clamp(bbox, width, height) {
                Ok(clamped) => {
                    if clamped != *bbox {
                        sink.push(format!("Clamped bbox {}: {} -> {}", index, bbox, clamped));
                        *bbox = clamped;
                    }
                    valid.push(true);
                }
                Err(err) => {
                    sink.push(format!("Index {}: {}", index, err));
                    valid.push(false);
                }
            }
        }

        Ok(FieldValidity::from([("bboxes".to_string(), valid)]))
    }

    fn remove_annotation(&mut self, index: usize) {
        if index < self.bboxes.len() {
            self.bboxes.remove(index);
        }
    }

    fn aggregate_objects(&self) -> BTreeMap<String, Vec<Value>> {
        let objects = self
            .bboxes
            .iter()
            .map(|bbox| {
                let (x, y, w, h) = bbox.to_xywh();
                json!({
                    "bbox_x": x,
                    "bbox_y": y,
                    "bbox_width": w,
                    "bbox_height": h,
                    "bbox_sqrt_area": bbox.area().sqrt(),
                    "bbox_aspect_ratio": w / h,
                })
            })
            .collect();
        BTreeMap::from([("bboxes".to_string(), objects)])
    }

    fn describe(&self) -> Vec<String> {
        let boxes: Vec<String> = self.bboxes.iter().map(BBox::to_string).collect();
        vec![format!("BBoxes: [{}]", boxes.join(", "))]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["add_bboxes(<Vec<BBox>>)".to_string()]
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
