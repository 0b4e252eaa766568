//! Per-object segmentation masks.

use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;

use super::{from_value, to_value, Attr, Component, Peers};
use crate::error::RecordError;
use crate::ir::{Collaborators, EncodedMask, MaskArray, MaskCodec};
use crate::registry::{ComponentKind, KindId, RECORD_COMPONENT};
use crate::task::Task;

/// Masks are stored encoded; `dense` exists only on a loaded record.
#[derive(Clone, Debug)]
pub struct MasksComponent {
    task: Task,
    encoded: Vec<EncodedMask>,
    dense: Option<Vec<MaskArray>>,
}

impl MasksComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("MasksComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            encoded: Vec::new(),
            dense: None,
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_masks(&mut self, masks: Vec<EncodedMask>) {
        self.encoded = masks;
        self.dense = None;
    }

    pub fn add_encoded_masks(&mut self, masks: impl IntoIterator<Item = EncodedMask>) {
        self.encoded.extend(masks);
        self.dense = None;
    }

    /// Encodes dense masks with `codec` and appends them.
    pub fn add_masks(&mut self, masks: &[MaskArray], codec: &dyn MaskCodec) {
        self.add_encoded_masks(masks.iter().map(|mask| codec.encode(mask)));
    }

    pub fn encoded_masks(&self) -> &[EncodedMask] {
        &self.encoded
    }

    /// Dense masks, present only after a load.
    pub fn masks(&self) -> Option<&[MaskArray]> {
        self.dense.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.dense.is_some()
    }
}

impl Default for MasksComponent {
    fn default() -> Self {
        Self::new(Task::detect())
    }
}

impl Component for MasksComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "mask"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::Masks]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::Masks => Some(to_value(&self.encoded)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::Masks => {
                let masks = from_value(attr, value)?;
                self.set_masks(masks);
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::Masks => {
                self.set_masks(Vec::new());
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    /// Decodes every mask at the record's image size, or at the mask's own
    /// size when the record does not know it.
    fn load(&mut self, peers: &mut Peers<'_>, tools: &Collaborators) -> Result<(), RecordError> {
        let size = peers.image_size();
        let dense = self
            .encoded
            .iter()
            .map(|mask| {
                let (width, height) = size.unwrap_or((mask.width, mask.height));
                tools.masks.decode(mask, height, width)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.dense = Some(dense);
        Ok(())
    }

    fn unload(&mut self) {
        self.dense = None;
    }

    fn num_annotations(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([("masks".to_string(), self.encoded.len())])
    }

    fn remove_annotation(&mut self, index: usize) {
        if index < self.encoded.len() {
            self.encoded.remove(index);
        }
        if let Some(dense) = self.dense.as_mut() {
            if index < dense.len() {
                dense.remove(index);
            }
        }
    }

    fn describe(&self) -> Vec<String> {
        let state = if self.is_loaded() { "loaded" } else { "encoded" };
        let areas: Vec<u64> = self.encoded.iter().map(EncodedMask::area).collect();
        vec![format!("Masks: {} {} (areas {:?})", self.encoded.len(), state, areas)]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["add_encoded_masks(<Vec<EncodedMask>>)".to_string()]
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::RunLengthCodec;

    fn square() -> MaskArray {
        let mut mask = MaskArray::zeros(4, 4);
        mask.set(1, 1, true);
        mask.set(1, 2, true);
        mask.set(2, 1, true);
        mask.set(2, 2, true);
        mask
    }

    #[test]
    fn test_load_then_unload_restores_encoded() {
        let mut masks = MasksComponent::default();
        masks.add_masks(&[square()], &RunLengthCodec);
        let before = masks.encoded_masks().to_vec();

        masks
            .load(&mut Peers::none(), &Collaborators::default())
            .unwrap();
        assert_eq!(masks.masks().unwrap()[0], square());

        masks.unload();
        assert!(!masks.is_loaded());
        assert_eq!(masks.encoded_masks(), before.as_slice());
    }

    #[test]
    fn test_remove_drops_dense_too() {
        let mut masks = MasksComponent::default();
        masks.add_masks(&[square(), MaskArray::zeros(4, 4)], &RunLengthCodec);
        masks
            .load(&mut Peers::none(), &Collaborators::default())
            .unwrap();
        masks.remove_annotation(0);
        assert_eq!(masks.encoded_masks().len(), 1);
        assert_eq!(masks.masks().unwrap().len(), 1);
    }
}
