#![allow(dead_code)]

use annorecord::ir::{BBox, ClampToImage, GeometryValidator, MaskArray};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Image sizes small enough that generated boxes often cross the border.
pub fn arb_image_size() -> impl Strategy<Value = (u32, u32)> {
    (1u32..200, 1u32..200)
}

/// Boxes around an image of the given size: some inside, some crossing the
/// border, some inverted or fully outside.
pub fn arb_bbox(width: u32, height: u32) -> impl Strategy<Value = BBox> {
    let (w, h) = (width as f64, height as f64);
    (-20.0..w + 20.0, -20.0..h + 20.0, -10.0..60.0f64, -10.0..60.0f64)
        .prop_map(|(x, y, bw, bh)| BBox::from_xywh(x, y, bw, bh))
}

/// An image size with up to `max_boxes` boxes for it.
pub fn arb_sized_boxes(max_boxes: usize) -> impl Strategy<Value = ((u32, u32), Vec<BBox>)> {
    arb_image_size().prop_flat_map(move |(w, h)| {
        (
            Just((w, h)),
            prop::collection::vec(arb_bbox(w, h), 0..=max_boxes),
        )
    })
}

/// Whether the default geometry validator accepts `bbox`.
pub fn survives(bbox: &BBox, width: u32, height: u32) -> bool {
    ClampToImage.validate_and_clamp(bbox, width, height).is_ok()
}

pub fn is_inside(bbox: &BBox, width: u32, height: u32) -> bool {
    bbox.xmin >= 0.0
        && bbox.ymin >= 0.0
        && bbox.xmax <= width as f64
        && bbox.ymax <= height as f64
        && bbox.xmin < bbox.xmax
        && bbox.ymin < bbox.ymax
}

/// A random binary mask of the given size.
pub fn arb_mask(height: u32, width: u32) -> impl Strategy<Value = MaskArray> {
    prop::collection::vec(0u8..2, (height * width) as usize).prop_map(move |data| MaskArray {
        height,
        width,
        data,
    })
}

/// A mask size with up to `max_masks` masks of that size.
pub fn arb_sized_masks(max_masks: usize) -> impl Strategy<Value = (u32, Vec<MaskArray>)> {
    (1u32..12).prop_flat_map(move |side| {
        (
            Just(side),
            prop::collection::vec(arb_mask(side, side), 0..=max_masks),
        )
    })
}
