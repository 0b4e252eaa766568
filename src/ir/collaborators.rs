//! The external services record hooks call into.

use std::fmt;

use super::bbox::{ClampToImage, GeometryValidator};
use super::image::{FileImageLoader, ImageLoader};
use super::mask::{MaskCodec, RunLengthCodec};

/// Geometry validation, mask coding and image loading, bundled so hooks
/// receive them as one argument.
pub struct Collaborators {
    pub geometry: Box<dyn GeometryValidator>,
    pub masks: Box<dyn MaskCodec>,
    pub images: Box<dyn ImageLoader>,
}

impl Collaborators {
    pub fn with_geometry(mut self, geometry: impl GeometryValidator + 'static) -> Self {
        self.geometry = Box::new(geometry);
        self
    }

    pub fn with_masks(mut self, masks: impl MaskCodec + 'static) -> Self {
        self.masks = Box::new(masks);
        self
    }

    pub fn with_images(mut self, images: impl ImageLoader + 'static) -> Self {
        self.images = Box::new(images);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            geometry: Box::new(ClampToImage),
            masks: Box::new(RunLengthCodec),
            images: Box::new(FileImageLoader),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
