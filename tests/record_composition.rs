use std::any::Any;

use annorecord::component::{
    BBoxesComponent, LabelsComponent, MasksComponent, ScoresComponent, SizeComponent,
};
use annorecord::registry::{ComponentKind, KindId, RECORD_COMPONENT};
use annorecord::{Attr, Blueprint, Component, Record, RecordConfig, RecordError, Registry, Task};
use serde_json::{json, Value};

mod common;

/// Exposes `width` with a fixed value at a configurable order.
#[derive(Clone, Debug)]
struct FixedWidth {
    task: Task,
    order: f64,
    width: u32,
}

impl FixedWidth {
    const KIND: ComponentKind = ComponentKind::new(KindId::new("FixedWidth"), &[RECORD_COMPONENT]);

    fn boxed(order: f64, width: u32) -> Box<dyn Component> {
        Box::new(Self {
            task: Task::default(),
            order,
            width,
        })
    }
}

impl Component for FixedWidth {
    fn kind(&self) -> KindId {
        Self::KIND.id
    }

    fn capability(&self) -> &'static str {
        "fixedwidth"
    }

    fn task(&self) -> &Task {
        &self.task
    }

    fn order(&self) -> f64 {
        self.order
    }

    fn exposes(&self) -> &'static [Attr] {
        &[Attr::Width]
    }

    fn read(&self, attr: Attr) -> Option<Value> {
        (attr == Attr::Width).then(|| json!(self.width))
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

fn sized_record(extra: Vec<Box<dyn Component>>) -> Record {
    let mut record = Record::new(extra).unwrap();
    record
        .component_mut::<SizeComponent>()
        .unwrap()
        .set_image_size(640, 480);
    record
}

#[test]
fn base_set_is_present_and_unioned_once() {
    let record = Record::new(vec![Box::new(SizeComponent::default())]).unwrap();
    let names: Vec<_> = record.default_composite().capabilities().collect();
    assert_eq!(names, vec!["imageid", "size"]);
}

#[test]
fn lower_order_wins_resolution() {
    let record = sized_record(vec![FixedWidth::boxed(0.1, 1)]);
    assert_eq!(record.get(Attr::Width).unwrap(), json!(1));
    assert_eq!(record.resolve(Attr::Width).unwrap().capability(), "fixedwidth");

    let record = sized_record(vec![FixedWidth::boxed(0.9, 1)]);
    assert_eq!(record.get(Attr::Width).unwrap(), json!(640));
    assert_eq!(record.resolve(Attr::Width).unwrap().capability(), "size");
}

#[test]
fn equal_order_breaks_ties_by_capability_name() {
    let record = sized_record(vec![FixedWidth::boxed(0.5, 1)]);
    // "fixedwidth" < "size"
    assert_eq!(record.get(Attr::Width).unwrap(), json!(1));
}

#[test]
fn serialize_merge_lets_higher_order_overwrite() {
    let record = sized_record(vec![FixedWidth::boxed(0.9, 1)]);
    let map = record.serialize();
    assert_eq!(map["width"], json!(1));
    assert_eq!(map["height"], json!(480));

    let record = sized_record(vec![FixedWidth::boxed(0.1, 1)]);
    assert_eq!(record.serialize()["width"], json!(640));
}

#[test]
fn disjoint_keys_merge_to_their_union() {
    let record = sized_record(Vec::new());
    let keys = record.keys();
    assert_eq!(keys, vec!["height", "imageid", "width"]);
    assert_eq!(record.len(), 3);
}

#[test]
fn reduction_is_deterministic() {
    let build = || {
        Record::new(vec![
            Box::new(ScoresComponent::default()),
            Box::new(LabelsComponent::default()),
            Box::new(BBoxesComponent::default()),
            FixedWidth::boxed(0.2, 3),
        ])
        .unwrap()
    };
    let first = build().describe();
    for _ in 0..5 {
        assert_eq!(build().describe(), first);
    }
    let order: Vec<_> = build()
        .reduce_by_task(|component| component.capability())
        .into_iter()
        .flat_map(|(_, caps)| caps)
        .collect();
    assert_eq!(order, vec!["fixedwidth", "imageid", "size", "bbox", "label", "score"]);
}

#[test]
fn missing_capability_fails_resolution() {
    let record = Record::new(vec![Box::new(BBoxesComponent::default())]).unwrap();

    assert!(matches!(
        record.get_in(Task::DETECT, Attr::Labels),
        Err(RecordError::AttributeResolution { attr: Attr::Labels, .. })
    ));
    assert!(matches!(
        record.get(Attr::LabelNames),
        Err(RecordError::AttributeResolution { .. })
    ));
}

#[test]
fn task_lookup_falls_back_to_default_composite() {
    let mut record = sized_record(vec![
        Box::new(BBoxesComponent::default()),
        Box::new(MasksComponent::new(Task::segment())),
    ]);
    assert_eq!(record.get_in(Task::SEGMENT, Attr::Height).unwrap(), json!(480));
    assert_eq!(record.get_in(Task::DETECT, Attr::BBoxes).unwrap(), json!([]));
    assert!(record.get_in(Task::SEGMENT, Attr::BBoxes).is_err());

    let tasks: Vec<_> = record.tasks().map(Task::name).collect();
    assert_eq!(tasks, vec!["default", "detect", "segment"]);

    record
        .set_in(Task::DETECT, Attr::BBoxes, json!([{ "xmin": 1.0, "ymin": 2.0, "xmax": 3.0, "ymax": 4.0 }]))
        .unwrap();
    assert_eq!(common::bboxes_of(&record).len(), 1);
}

#[test]
fn duplicate_capability_is_rejected_at_construction() {
    let err = Record::new(vec![
        Box::new(BBoxesComponent::default()),
        Box::new(BBoxesComponent::default()),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        RecordError::DuplicateCapability { capability, task } if capability == "bbox" && task == "detect"
    ));
}

#[test]
fn same_capability_in_two_tasks_is_allowed() {
    let record = Record::new(vec![
        Box::new(BBoxesComponent::default()),
        Box::new(BBoxesComponent::new(Task::segment())),
    ])
    .unwrap();
    assert!(record.find_in::<BBoxesComponent>(Task::SEGMENT).is_some());
    assert!(record.find_in::<BBoxesComponent>(Task::DETECT).is_some());
}

#[test]
fn add_components_is_a_union() {
    let mut record = common::detection_record(1, (100, 100), vec![common::valid_box(0)], &["a"]);

    record
        .add_components(vec![
            Box::new(BBoxesComponent::default()),
            Box::new(ScoresComponent::default()),
            Box::new(MasksComponent::new(Task::segment())),
        ])
        .unwrap();

    // The existing bboxes component keeps its data.
    assert_eq!(common::bboxes_of(&record).len(), 1);
    let detect: Vec<_> = record.composite(Task::DETECT).unwrap().capabilities().collect();
    assert_eq!(detect, vec!["bbox", "label", "score"]);
    assert!(record.composite(Task::SEGMENT).is_some());
}

#[test]
fn custom_default_task_receives_base_components() {
    let config = RecordConfig::default().with_default_task(Task::new("main", 0));
    let record = Record::with_config(config, Vec::new()).unwrap();
    assert_eq!(record.default_composite().task().name(), "main");
    assert!(record.find::<SizeComponent>().is_some());
}

#[test]
fn load_leaves_canonical_record_untouched() {
    let record = common::detection_record(9, (10, 10), vec![common::valid_box(0)], &["a"]);
    let before = record.serialize_by_task();

    let mut loaded = record.load(&Default::default()).unwrap();
    loaded
        .component_in_mut::<BBoxesComponent>(Task::DETECT)
        .unwrap()
        .add_bboxes([common::valid_box(1)]);

    assert_eq!(record.serialize_by_task(), before);
    assert_eq!(common::bboxes_of(&loaded).len(), 2);
}

#[test]
fn registry_resolve_feeds_blank_like() {
    let registry = Registry::builtin().unwrap();
    let record = Blueprint::new()
        .with("filepath")
        .with("bbox")
        .with("label")
        .build(&registry, RecordConfig::default())
        .unwrap();

    let blank = record.blank_like(&registry).unwrap();
    let default: Vec<_> = blank.default_composite().capabilities().collect();
    assert_eq!(default, vec!["filepath", "imageid", "size"]);
    assert_eq!(blank.builder_template(), record.builder_template());
}

#[test]
fn aggregate_objects_groups_by_task() {
    let record = common::detection_record(
        1,
        (100, 100),
        vec![common::valid_box(0), common::valid_box(1)],
        &["a", "b"],
    );
    let objects = record.aggregate_objects();
    assert_eq!(objects["detect"]["bboxes"].len(), 2);
    assert_eq!(objects["detect"]["labels"], vec![json!(1), json!(2)]);
    assert_eq!(objects["default"]["img_size"][0]["img_width"], json!(100));
}

#[test]
fn aggregate_objects_keeps_same_field_of_two_tasks() {
    let mut record = common::detection_record(
        1,
        (100, 100),
        vec![common::valid_box(0), common::valid_box(1)],
        &["a", "b"],
    );
    record
        .add_components(vec![Box::new(BBoxesComponent::new(Task::segment()))])
        .unwrap();

    let objects = record.aggregate_objects();
    assert_eq!(objects["detect"]["bboxes"].len(), 2);
    assert!(objects["segment"]["bboxes"].is_empty());
}

#[test]
fn replacing_class_map_renames_labels() {
    let mut record = common::detection_record(1, (100, 100), vec![common::valid_box(0)], &["cat"]);

    record
        .set_in(Task::DETECT, Attr::ClassMap, json!(["background", "dog"]))
        .unwrap();
    assert_eq!(common::label_names_of(&record), vec!["dog".to_string()]);

    let err = record
        .set_in(Task::DETECT, Attr::ClassMap, json!(["background"]))
        .unwrap_err();
    assert!(matches!(err, RecordError::UnknownClassId(_)));
    assert_eq!(common::label_names_of(&record), vec!["dog".to_string()]);
}
