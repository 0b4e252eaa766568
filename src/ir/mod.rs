//! Value types carried by record components, and the contracts of the
//! services those components delegate to.
//!
//! Geometry math, mask coding and image loading are not part of the record
//! model itself. Components only call them through the narrow traits defined
//! here ([`GeometryValidator`], [`MaskCodec`], [`ImageLoader`]), and a
//! [`Collaborators`] value carries one implementation of each. The defaults
//! are small: a box clamp, a row-major run-length codec and a
//! loader that reads files and probes their dimensions.

mod bbox;
mod class_map;
mod collaborators;
mod ids;
mod image;
mod keypoint;
mod mask;

pub use bbox::{BBox, ClampToImage, GeometryValidator, InvalidGeometry};
pub use class_map::{ClassMap, BACKGROUND};
pub use collaborators::Collaborators;
pub use ids::{ClassId, ImageId};
pub use image::{FileImageLoader, ImageData, ImageLoader};
pub use keypoint::{KeyPoint, KeyPoints};
pub use mask::{EncodedMask, MaskArray, MaskCodec, RunLengthCodec};
