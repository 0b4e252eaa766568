//! Components describing the image itself: identity, size and payload.

use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{from_value, to_value, Attr, Component, Peers};
use crate::autofix::ReportSink;
use crate::error::RecordError;
use crate::ir::{Collaborators, ImageData, ImageId};
use crate::registry::{ComponentKind, KindId, RECORD_COMPONENT};
use crate::task::Task;

/// Identity of the image a record describes.
#[derive(Clone, Debug)]
pub struct ImageIdComponent {
    task: Task,
    imageid: Option<ImageId>,
}

impl ImageIdComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("ImageIdComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            imageid: None,
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_imageid(&mut self, imageid: impl Into<ImageId>) {
        self.imageid = Some(imageid.into());
    }

    pub fn imageid(&self) -> Option<ImageId> {
        self.imageid
    }
}

impl Default for ImageIdComponent {
    fn default() -> Self {
        Self::new(Task::default())
    }
}

impl Component for ImageIdComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "imageid"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::ImageId]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::ImageId => Some(to_value(&self.imageid)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::ImageId => {
                self.imageid = from_value(attr, value)?;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::ImageId => {
                self.imageid = None;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn describe(&self) -> Vec<String> {
        match self.imageid {
            Some(id) => vec![format!("Image ID: {}", id)],
            None => vec!["Image ID: (unset)".to_string()],
        }
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["set_imageid(<u64>)".to_string()]
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

/// Image width and height, plus the size the image had when first opened.
#[derive(Clone, Debug)]
pub struct SizeComponent {
    task: Task,
    width: Option<u32>,
    height: Option<u32>,
    original: Option<(u32, u32)>,
}

impl SizeComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("SizeComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            width: None,
            height: None,
            original: None,
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_image_size(&mut self, width: u32, height: u32) {
        self.set_img_size(width, height, false);
    }

    /// Sets the current size; `original` also records it as the source size.
    pub fn set_img_size(&mut self, width: u32, height: u32, original: bool) {
        self.width = Some(width);
        self.height = Some(height);
        if original {
            self.original = Some((width, height));
        }
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    /// (width, height) when both are known.
    pub fn img_size(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }

    pub fn original_img_size(&self) -> Option<(u32, u32)> {
        self.original
    }
}

impl Default for SizeComponent {
    fn default() -> Self {
        Self::new(Task::default())
    }
}

impl Component for SizeComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "size"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::Width, Attr::Height]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::Width => Some(to_value(&self.width)),
            Attr::Height => Some(to_value(&self.height)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::Width => self.width = from_value(attr, value)?,
            Attr::Height => self.height = from_value(attr, value)?,
            _ => return Err(RecordError::ReadOnly(attr)),
        }
        Ok(())
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::Width => self.width = None,
            Attr::Height => self.height = None,
            _ => return Err(RecordError::ReadOnly(attr)),
        }
        Ok(())
    }

    fn aggregate_objects(&self) -> BTreeMap<String, Vec<Value>> {
        let info = json!({ "img_width": self.width, "img_height": self.height });
        BTreeMap::from([("img_size".to_string(), vec![info])])
    }

    fn describe(&self) -> Vec<String> {
        match self.img_size() {
            Some((w, h)) => vec![format!("Image size (width, height): ({}, {})", w, h)],
            None => vec!["Image size (width, height): (unset)".to_string()],
        }
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["set_img_size(<width>, <height>, <original>)".to_string()]
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

fn describe_img(img: &Option<ImageData>) -> String {
    match img {
        Some(img) => format!("Image: {}x{} ({} bytes)", img.width, img.height, img.bytes.len()),
        None => "Image: not loaded".to_string(),
    }
}

/// An image already held in memory.
#[derive(Clone, Debug)]
pub struct ImageComponent {
    task: Task,
    img: Option<ImageData>,
}

impl ImageComponent {
    pub const KIND: ComponentKind =
        ComponentKind::new(KindId::new("ImageComponent"), &[RECORD_COMPONENT])
            .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self { task, img: None }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_img(&mut self, img: ImageData) {
        self.img = Some(img);
    }

    pub fn img(&self) -> Option<&ImageData> {
        self.img.as_ref()
    }
}

impl Default for ImageComponent {
    fn default() -> Self {
        Self::new(Task::default())
    }
}

impl Component for ImageComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "image"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::Image]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::Image => Some(to_value(&self.img)),
            _ => None,
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::Image => {
                self.img = None;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn describe(&self) -> Vec<String> {
        vec![describe_img(&self.img)]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["set_img(<ImageData>)".to_string()]
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

/// An image stored on disk, opened on load.
///
/// Loading also records the opened dimensions on the record's
/// [`SizeComponent`] as the original size.
#[derive(Clone, Debug)]
pub struct FilepathComponent {
    task: Task,
    filepath: Option<PathBuf>,
    img: Option<ImageData>,
}

impl FilepathComponent {
    pub const KIND: ComponentKind = ComponentKind::new(
        KindId::new("FilepathComponent"),
        &[ImageComponent::KIND.id, RECORD_COMPONENT],
    )
    .with_constructor(Self::build);

    pub fn new(task: Task) -> Self {
        Self {
            task,
            filepath: None,
            img: None,
        }
    }

    fn build(task: Option<Task>) -> Box<dyn Component> {
        Box::new(task.map(Self::new).unwrap_or_default())
    }

    pub fn set_filepath(&mut self, filepath: impl Into<PathBuf>) {
        self.filepath = Some(filepath.into());
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn img(&self) -> Option<&ImageData> {
        self.img.as_ref()
    }
}

impl Default for FilepathComponent {
    fn default() -> Self {
        Self::new(Task::default())
    }
}

impl Component for FilepathComponent {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "filepath"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::Filepath, Attr::Image]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        match attr {
            Attr::Filepath => Some(to_value(&self.filepath)),
            Attr::Image => Some(to_value(&self.img)),
            _ => None,
        }
    }

    fn assign(&mut self, attr: Attr, value: Value) -> Result<(), RecordError> {
        match attr {
            Attr::Filepath => {
                self.filepath = from_value(attr, value)?;
                Ok(())
            }
            _ => Err(RecordError::ReadOnly(attr)),
        }
    }

    fn clear(&mut self, attr: Attr) -> Result<(), RecordError> {
        match attr {
            Attr::Filepath => self.filepath = None,
            Attr::Image => self.img = None,
            _ => return Err(RecordError::ReadOnly(attr)),
        }
        Ok(())
    }

    fn load(&mut self, peers: &mut Peers<'_>, tools: &Collaborators) -> Result<(), RecordError> {
        let Some(path) = self.filepath.as_deref() else {
            return Ok(());
        };
        let img = tools.images.open_image(path)?;

        let size = peers
            .find_mut::<SizeComponent>()
            .ok_or_else(|| RecordError::MissingComponent {
                component: "SizeComponent".to_string(),
                task: self.task.name().to_string(),
            })?;
        size.set_img_size(img.width, img.height, true);

        self.img = Some(img);
        Ok(())
    }

    fn unload(&mut self) {
        self.img = None;
    }

    fn autofix(
        &mut self,
        _peers: &Peers<'_>,
        _tools: &Collaborators,
        _sink: &mut ReportSink,
    ) -> Result<super::FieldValidity, RecordError> {
        match self.filepath.as_deref() {
            Some(path) if path.exists() => Ok(super::FieldValidity::new()),
            Some(path) => Err(RecordError::AutofixAbort(format!(
                "File '{}' does not exist",
                path.display()
            ))),
            None => Err(RecordError::AutofixAbort("Filepath is not set".to_string())),
        }
    }

    fn describe(&self) -> Vec<String> {
        let path = self
            .filepath
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(unset)".to_string());
        vec![format!("Filepath: {}", path), describe_img(&self.img)]
    }

    fn builder_template(&self) -> Vec<String> {
        vec!["set_filepath(<impl Into<PathBuf>>)".to_string()]
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

    #[test]
    fn test_size_tracks_original() {
        let mut size = SizeComponent::default();
        size.set_image_size(640, 480);
        assert_eq!(size.img_size(), Some((640, 480)));
        assert_eq!(size.original_img_size(), None);

        size.set_img_size(320, 240, true);
        assert_eq!(size.original_img_size(), Some((320, 240)));
    }

    #[test]
    fn test_size_serializes_width_and_height() {
        let mut size = SizeComponent::default();
        size.set_image_size(640, 480);
        let map = size.serialize();
        assert_eq!(map.get("width"), Some(&json!(640)));
        assert_eq!(map.get("height"), Some(&json!(480)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_imageid_assign_through_attr() {
        let mut imageid = ImageIdComponent::default();
        imageid.assign(Attr::ImageId, json!(42)).unwrap();
        assert_eq!(imageid.imageid(), Some(ImageId(42)));
        assert!(matches!(
            imageid.assign(Attr::ImageId, json!("x")),
            Err(RecordError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file_aborts_autofix() {
        let mut filepath = FilepathComponent::default();
        filepath.set_filepath("/definitely/not/here.jpg");
        let mut sink = ReportSink::new("test");
        let err = filepath
            .autofix(&Peers::none(), &Collaborators::default(), &mut sink)
            .unwrap_err();
        assert!(err.is_autofix_abort());
    }
}
