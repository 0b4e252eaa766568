//! Keypoints attached to a single annotated object.

use serde::{Deserialize, Serialize};

/// One keypoint in pixel coordinates with a COCO-style visibility flag
/// (0 = not labeled, 1 = labeled but hidden, 2 = visible).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub x: f64,
    pub y: f64,
    pub visible: u8,
}

impl KeyPoint {
    pub fn new(x: f64, y: f64, visible: u8) -> Self {
        Self { x, y, visible }
    }
}

/// All keypoints of one object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPoints {
    pub points: Vec<KeyPoint>,
}

impl KeyPoints {
    pub fn new(points: Vec<KeyPoint>) -> Self {
        Self { points }
    }

    /// Builds keypoints from a flat `[x0, y0, v0, x1, y1, v1, ...]` list.
    ///
    /// A trailing partial triple is ignored.
    pub fn from_xyv(values: &[f64]) -> Self {
        let points = values
            .chunks_exact(3)
            .map(|xyv| KeyPoint::new(xyv[0], xyv[1], xyv[2] as u8))
            .collect();
        Self { points }
    }

    pub fn visible(&self) -> impl Iterator<Item = &KeyPoint> {
        self.points.iter().filter(|kpt| kpt.visible > 0)
    }
}
