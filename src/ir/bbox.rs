//! Bounding boxes and the geometry validator used by bbox autofix.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An axis-aligned bounding box in pixel XYXY format (xmin, ymin, xmax, ymax).
///
/// Construction does not enforce min < max; malformed boxes are representable
/// so that autofix can find and remove them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBox {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Converts from XYWH format where (x, y) is the top-left corner.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    #[inline]
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (self.xmin, self.ymin, self.width(), self.height())
    }

    /// May be negative if the box is malformed.
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// May be negative if the box is malformed.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite() && self.ymin.is_finite() && self.xmax.is_finite() && self.ymax.is_finite()
    }

    /// Returns true if min <= max on both axes.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1}, {:.1}, {:.1}, {:.1})",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

/// A single box failed geometry validation.
///
/// Never fatal for a record: the annotation at that index is removed.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("invalid bbox {bbox}: {reason}")]
pub struct InvalidGeometry {
    pub bbox: BBox,
    pub reason: String,
}

/// Validates a box against the image it belongs to, returning a repaired copy.
pub trait GeometryValidator {
    fn validate_and_clamp(
        &self,
        bbox: &BBox,
        image_width: u32,
        image_height: u32,
    ) -> Result<BBox, InvalidGeometry>;
}

/// Clamps boxes into `[0, width] x [0, height]` and rejects boxes that are
/// non-finite or empty after clamping.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClampToImage;

impl GeometryValidator for ClampToImage {
    fn validate_and_clamp(
        &self,
        bbox: &BBox,
        image_width: u32,
        image_height: u32,
    ) -> Result<BBox, InvalidGeometry> {
        if !bbox.is_finite() {
            return Err(InvalidGeometry {
                bbox: *bbox,
                reason: "non-finite coordinates".into(),
            });
        }

        let (w, h) = (image_width as f64, image_height as f64);
        let clamped = BBox::from_xyxy(
            bbox.xmin.max(0.0),
            bbox.ymin.max(0.0),
            bbox.xmax.min(w),
            bbox.ymax.min(h),
        );

        if clamped.xmin >= clamped.xmax {
            return Err(InvalidGeometry {
                bbox: *bbox,
                reason: format!("xmin must be lower than xmax (image width {})", image_width),
            });
        }
        if clamped.ymin >= clamped.ymax {
            return Err(InvalidGeometry {
                bbox: *bbox,
                reason: format!("ymin must be lower than ymax (image height {})", image_height),
            });
        }

        Ok(clamped)
    }
}
