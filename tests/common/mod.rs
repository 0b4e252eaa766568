#![allow(dead_code)]

use std::fs;
use std::path::Path;

use annorecord::component::{BBoxesComponent, ImageIdComponent, LabelsComponent, SizeComponent};
use annorecord::ir::BBox;
use annorecord::{Record, Task};

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// A record with bboxes and labels in the detect task.
pub fn detection_record(imageid: u64, size: (u32, u32), bboxes: Vec<BBox>, labels: &[&str]) -> Record {
    let mut record = Record::new(vec![
        Box::new(BBoxesComponent::default()),
        Box::new(LabelsComponent::default()),
    ])
    .expect("build record");
    record
        .component_mut::<ImageIdComponent>()
        .expect("imageid component")
        .set_imageid(imageid);
    record
        .component_mut::<SizeComponent>()
        .expect("size component")
        .set_image_size(size.0, size.1);
    record
        .component_in_mut::<BBoxesComponent>(Task::DETECT)
        .expect("bboxes component")
        .set_bboxes(bboxes);
    record
        .component_in_mut::<LabelsComponent>(Task::DETECT)
        .expect("labels component")
        .add_labels_names(labels);
    record
}

/// An 8x8 box that fits in a 100x100 image for `i < 9`.
pub fn valid_box(i: usize) -> BBox {
    BBox::from_xywh(i as f64 * 10.0, 5.0, 8.0, 8.0)
}

/// A box with xmin > xmax, rejected by every image size.
pub fn invalid_box() -> BBox {
    BBox::from_xyxy(50.0, 50.0, 40.0, 60.0)
}

pub fn bboxes_of(record: &Record) -> Vec<BBox> {
    record
        .component_in::<BBoxesComponent>(Task::DETECT)
        .expect("bboxes component")
        .bboxes()
        .to_vec()
}

pub fn label_names_of(record: &Record) -> Vec<String> {
    record
        .component_in::<LabelsComponent>(Task::DETECT)
        .expect("labels component")
        .labels_names()
        .to_vec()
}
