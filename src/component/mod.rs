//! Record components.
//!
//! A component is the smallest unit of record behavior: it belongs to one
//! task, declares a sort order, exposes a fixed set of [`Attr`] symbols, and
//! implements whichever cross-cutting hooks of [`Component`] concern it. Every
//! hook has a no-op default, so a component only writes the ones it needs.
//!
//! Components never hold a pointer to their owner. Hooks that need a peer
//! (the bbox autofix reading the image size, the filepath load writing it)
//! receive a [`Peers`] view of the other components for the duration of the
//! call.

mod bboxes;
mod fields;
mod image;
mod labels;
mod masks;

pub use bboxes::BBoxesComponent;
pub use fields::{AreasComponent, IsCrowdsComponent, KeyPointsComponent, ScoresComponent};
pub use image::{FilepathComponent, ImageComponent, ImageIdComponent, SizeComponent};
pub use labels::{ClassMapComponent, LabelsComponent};
pub use masks::MasksComponent;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::autofix::ReportSink;
use crate::composite::Composite;
use crate::error::RecordError;
use crate::ir::Collaborators;
use crate::registry::KindId;
use crate::task::Task;

/// Sort order used by every built-in component.
pub const DEFAULT_ORDER: f64 = 0.5;

/// Per-field validity masks returned by autofix, one entry per annotation.
pub type FieldValidity = BTreeMap<String, Vec<bool>>;

/// Attribute symbols a component can expose.
///
/// Resolution is a lookup in this closed table: the first component, in sort
/// order, whose [`Component::exposes`] list contains the symbol wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attr {
    ImageId,
    Width,
    Height,
    Filepath,
    Image,
    ClassMap,
    Labels,
    LabelNames,
    BBoxes,
    Masks,
    Areas,
    IsCrowds,
    KeyPoints,
    Scores,
}

impl Attr {
    pub const ALL: [Attr; 14] = [
        Attr::ImageId,
        Attr::Width,
        Attr::Height,
        Attr::Filepath,
        Attr::Image,
        Attr::ClassMap,
        Attr::Labels,
        Attr::LabelNames,
        Attr::BBoxes,
        Attr::Masks,
        Attr::Areas,
        Attr::IsCrowds,
        Attr::KeyPoints,
        Attr::Scores,
    ];

    /// Key under which the attribute appears in a serialized record.
    pub fn key(&self) -> &'static str {
        match self {
            Attr::ImageId => "imageid",
            Attr::Width => "width",
            Attr::Height => "height",
            Attr::Filepath => "filepath",
            Attr::Image => "img",
            Attr::ClassMap => "class_map",
            Attr::Labels => "labels",
            Attr::LabelNames => "labels_names",
            Attr::BBoxes => "bboxes",
            Attr::Masks => "masks",
            Attr::Areas => "areas",
            Attr::IsCrowds => "iscrowds",
            Attr::KeyPoints => "keypoints",
            Attr::Scores => "scores",
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Attr {
    type Err = RecordError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Attr::ALL
            .into_iter()
            .find(|attr| attr.key() == key)
            .ok_or_else(|| RecordError::UnknownKey(key.to_string()))
    }
}

/// The behavior shared by all record components.
pub trait Component: fmt::Debug {
    /// Concrete kind, as registered in the [`Registry`](crate::Registry).
    fn kind(&self) -> KindId;

    /// Capability name this component implements. Secondary sort key.
    fn capability(&self) -> &'static str;

    fn task(&self) -> &Task;

    fn order(&self) -> f64 {
        DEFAULT_ORDER
    }

    fn exposes(&self) -> &'static [Attr] {
        &[]
    }

    /// Current value of an exposed attribute.
    fn read(&self, _attr: Attr) -> Option<Value> {
        None
    }

    /// Replaces an exposed attribute through the component's setter.
    fn assign(&mut self, attr: Attr, _value: Value) -> Result<(), RecordError> {
        Err(RecordError::ReadOnly(attr))
    }

    /// Resets an exposed attribute to its empty state.
    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        Err(RecordError::ReadOnly(attr))
    }

    /// Flat snapshot of the exposed attributes.
    fn serialize(&self) -> Map<String, Value> {
        self.exposes()
            .iter()
            .filter_map(|attr| self.read(*attr).map(|value| (attr.key().to_string(), value)))
            .collect()
    }

    /// Materializes heavy payload (pixels, dense masks).
    fn load(&mut self, _peers: &mut Peers<'_>, _tools: &Collaborators) -> Result<(), RecordError> {
        Ok(())
    }

    /// Drops heavy payload, keeping the lightweight form.
    fn unload(&mut self) {}

    /// Length of each per-annotation list this component owns.
    fn num_annotations(&self) -> BTreeMap<String, usize> {
        BTreeMap::new()
    }

    /// Validates every annotation element, repairing in place where possible.
    ///
    /// Returns one mask per owned field. Errors reject the whole record.
    fn autofix(
        &mut self,
        _peers: &Peers<'_>,
        _tools: &Collaborators,
        _sink: &mut ReportSink,
    ) -> Result<FieldValidity, RecordError> {
        Ok(FieldValidity::new())
    }

    /// Drops the annotation at `index` from every owned list.
    fn remove_annotation(&mut self, _index: usize) {}

    /// Flat per-object values, keyed by field.
    fn aggregate_objects(&self) -> BTreeMap<String, Vec<Value>> {
        BTreeMap::new()
    }

    /// Human-readable lines for diagnostics.
    fn describe(&self) -> Vec<String> {
        Vec::new()
    }

    /// Setter calls that fill this component, e.g. `add_bboxes(<Vec<BBox>>)`.
    fn builder_template(&self) -> Vec<String> {
        Vec::new()
    }

    fn clone_box(&self) -> Box<dyn Component>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The other components around the one a hook runs on, plus the fallback
/// composite of the record (set for non-default tasks).
///
/// Lookups visit lower-order peers, then higher-order peers, then the parent.
pub struct Peers<'a> {
    before: &'a mut [Box<dyn Component>],
    after: &'a mut [Box<dyn Component>],
    parent: Option<&'a mut Composite>,
}

impl<'a> Peers<'a> {
    pub(crate) fn new(
        before: &'a mut [Box<dyn Component>],
        after: &'a mut [Box<dyn Component>],
        parent: Option<&'a mut Composite>,
    ) -> Self {
        Self {
            before,
            after,
            parent,
        }
    }

    /// A view with no peers at all.
    pub fn none() -> Peers<'static> {
        Peers {
            before: &mut [],
            after: &mut [],
            parent: None,
        }
    }

    pub fn resolve(&self, attr: Attr) -> Option<&dyn Component> {
        for component in self.before.iter().chain(self.after.iter()) {
            if component.exposes().contains(&attr) {
                return Some(component.as_ref());
            }
        }
        self.parent
            .as_deref()
            .and_then(|parent| parent.resolve_local(attr))
    }

    pub fn read(&self, attr: Attr) -> Option<Value> {
        self.resolve(attr).and_then(|component| component.read(attr))
    }

    /// Image (width, height), if some peer knows it.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        let width = self.read(Attr::Width)?.as_u64()?;
        let height = self.read(Attr::Height)?.as_u64()?;
        Some((u32::try_from(width).ok()?, u32::try_from(height).ok()?))
    }

    pub fn find<T: Component + 'static>(&self) -> Option<&T> {
        self.before
            .iter()
            .chain(self.after.iter())
            .find_map(|component| component.as_any().downcast_ref::<T>())
            .or_else(|| self.parent.as_deref().and_then(|parent| parent.find::<T>()))
    }

    pub fn find_mut<T: Component + 'static>(&mut self) -> Option<&mut T> {
        if let Some(found) = self
            .before
            .iter_mut()
            .chain(self.after.iter_mut())
            .find_map(|component| component.as_any_mut().downcast_mut::<T>())
        {
            return Some(found);
        }
        self.parent
            .as_deref_mut()
            .and_then(|parent| parent.find_mut::<T>())
    }
}

/// Deserializes an attribute value, tagging failures with the attribute.
pub(crate) fn from_value<T: DeserializeOwned>(attr: Attr, value: Value) -> Result<T, RecordError> {
    serde_json::from_value(value).map_err(|source| RecordError::InvalidValue { attr, source })
}

/// Serializes a value that is known to be representable as JSON.
pub(crate) fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
