//! Per-task component collections and the reduction primitive.
//!
//! A [`Composite`] holds at most one component per capability, all sharing one
//! task, kept sorted by `(order, capability name)`. Every cross-cutting record
//! operation (serialize, count, autofix, remove, aggregate, describe) is a
//! reduction over that sorted list; nothing iterates components any other way.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::component::{Attr, Component, Peers};
use crate::error::RecordError;
use crate::task::Task;

/// Left fold used to combine per-component results.
///
/// Map merges let a later (higher-order) component overwrite an earlier one's
/// key; list merges concatenate.
pub trait Merge {
    fn merge(&mut self, other: Self);
}

impl<K: Ord, V> Merge for BTreeMap<K, V> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<T> Merge for Vec<T> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl Merge for Map<String, Value> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

/// Folds results left to right, starting from the first one.
pub fn merge_all<T: Merge + Default>(results: impl IntoIterator<Item = T>) -> T {
    let mut results = results.into_iter();
    let Some(mut acc) = results.next() else {
        return T::default();
    };
    for next in results {
        acc.merge(next);
    }
    acc
}

fn sort_components(components: &mut [Box<dyn Component>]) {
    components.sort_by(|a, b| {
        a.order()
            .total_cmp(&b.order())
            .then_with(|| a.capability().cmp(b.capability()))
    });
}

/// The components of one task.
///
/// A composite never points back at the record that owns it. For a
/// non-default task, the record passes its default composite as the fallback
/// parent where a lookup or hook needs one.
#[derive(Debug)]
pub struct Composite {
    task: Task,
    components: Vec<Box<dyn Component>>,
}

impl Composite {
    /// Builds a composite from the requested components, then unions in
    /// every `base` component whose capability is not already present.
    ///
    /// # Errors
    /// [`RecordError::DuplicateCapability`] if two requested components share
    /// a capability, [`RecordError::TaskMismatch`] if any component belongs to
    /// another task.
    pub fn new(
        task: Task,
        requested: Vec<Box<dyn Component>>,
        base: Vec<Box<dyn Component>>,
    ) -> Result<Self, RecordError> {
        let mut composite = Self {
            task,
            components: Vec::with_capacity(requested.len() + base.len()),
        };

        for component in requested {
            composite.check_task(component.as_ref())?;
            if composite.contains(component.capability()) {
                return Err(RecordError::DuplicateCapability {
                    capability: component.capability().to_string(),
                    task: composite.task.name().to_string(),
                });
            }
            composite.components.push(component);
        }

        for component in base {
            composite.check_task(component.as_ref())?;
            if !composite.contains(component.capability()) {
                composite.components.push(component);
            }
        }

        sort_components(&mut composite.components);
        Ok(composite)
    }

    fn check_task(&self, component: &dyn Component) -> Result<(), RecordError> {
        if component.task() != &self.task {
            return Err(RecordError::TaskMismatch {
                expected: self.task.name().to_string(),
                found: component.task().name().to_string(),
            });
        }
        Ok(())
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Components in resolution order.
    pub fn components(&self) -> &[Box<dyn Component>] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.components
            .iter()
            .any(|component| component.capability() == capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.iter().map(|component| component.capability())
    }

    /// Union with more components; capabilities already present are skipped.
    pub fn add_components(&mut self, more: Vec<Box<dyn Component>>) -> Result<(), RecordError> {
        for component in more {
            self.check_task(component.as_ref())?;
            if self.contains(component.capability()) {
                debug!(
                    task = %self.task,
                    capability = component.capability(),
                    "skipping component, capability already present"
                );
                continue;
            }
            self.components.push(component);
        }
        sort_components(&mut self.components);
        Ok(())
    }

    /// First component in sort order exposing `attr`, without fallback.
    pub fn resolve_local(&self, attr: Attr) -> Option<&dyn Component> {
        for component in &self.components {
            if component.exposes().contains(&attr) {
                return Some(component.as_ref());
            }
        }
        None
    }

    pub fn resolve_local_mut(&mut self, attr: Attr) -> Option<&mut dyn Component> {
        for component in &mut self.components {
            if component.exposes().contains(&attr) {
                return Some(component.as_mut());
            }
        }
        None
    }

    /// Resolves `attr` locally, then in `parent`.
    ///
    /// # Errors
    /// [`RecordError::AttributeResolution`] if neither provides it.
    pub fn resolve<'a>(
        &'a self,
        attr: Attr,
        parent: Option<&'a Composite>,
    ) -> Result<&'a dyn Component, RecordError> {
        self.resolve_local(attr)
            .or_else(|| parent.and_then(|parent| parent.resolve_local(attr)))
            .ok_or_else(|| RecordError::AttributeResolution {
                attr,
                task: self.task.name().to_string(),
            })
    }

    pub fn find<T: Component + 'static>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|component| component.as_any().downcast_ref::<T>())
    }

    pub fn find_mut<T: Component + 'static>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<T>())
    }

    /// Calls `op` on every component in sort order, one result each.
    pub fn reduce<R>(&self, mut op: impl FnMut(&dyn Component) -> R) -> Vec<R> {
        self.components
            .iter()
            .map(|component| op(component.as_ref()))
            .collect()
    }

    /// [`Composite::reduce`] folded with [`Merge`].
    pub fn reduce_merged<R: Merge + Default>(&self, op: impl FnMut(&dyn Component) -> R) -> R {
        merge_all(self.reduce(op))
    }

    /// Mutable reduction. Each call sees the other components, plus `parent`,
    /// through a [`Peers`] view.
    pub fn reduce_mut<R>(
        &mut self,
        mut parent: Option<&mut Composite>,
        mut op: impl FnMut(&mut dyn Component, &mut Peers<'_>) -> R,
    ) -> Vec<R> {
        let mut results = Vec::with_capacity(self.components.len());
        for index in 0..self.components.len() {
            let (before, rest) = self.components.split_at_mut(index);
            if let Some((current, after)) = rest.split_first_mut() {
                let mut peers = Peers::new(before, after, parent.as_deref_mut());
                results.push(op(current.as_mut(), &mut peers));
            }
        }
        results
    }

    pub fn serialize(&self) -> Map<String, Value> {
        self.reduce_merged(|component| component.serialize())
    }

    pub fn num_annotations(&self) -> BTreeMap<String, usize> {
        self.reduce_merged(|component| component.num_annotations())
    }

    pub fn remove_annotation(&mut self, index: usize) {
        self.reduce_mut(None, |component, _| component.remove_annotation(index));
    }

    pub fn unload(&mut self) {
        self.reduce_mut(None, |component, _| component.unload());
    }

    pub fn describe(&self) -> Vec<String> {
        self.reduce_merged(|component| component.describe())
    }
}

impl Clone for Composite {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            components: self.components.iter().map(|c| c.clone_box()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{BBoxesComponent, LabelsComponent, SizeComponent};
    use crate::ir::BBox;

    fn detect(components: Vec<Box<dyn Component>>) -> Result<Composite, RecordError> {
        Composite::new(Task::detect(), components, Vec::new())
    }

    #[test]
    fn test_sorted_by_capability_on_equal_order() {
        let composite = detect(vec![
            Box::new(LabelsComponent::default()),
            Box::new(BBoxesComponent::default()),
        ])
        .unwrap();
        let names: Vec<_> = composite.capabilities().collect();
        assert_eq!(names, vec!["bbox", "label"]);
    }

    #[test]
    fn test_duplicate_capability_rejected() {
        let err = detect(vec![
            Box::new(BBoxesComponent::default()),
            Box::new(BBoxesComponent::default()),
        ])
        .unwrap_err();
        assert!(matches!(err, RecordError::DuplicateCapability { .. }));
    }

    #[test]
    fn test_task_mismatch_rejected() {
        let err = detect(vec![Box::new(SizeComponent::default())]).unwrap_err();
        assert!(matches!(
            err,
            RecordError::TaskMismatch { expected, found } if expected == "detect" && found == "default"
        ));
    }

    #[test]
    fn test_base_union_is_idempotent() {
        let composite = Composite::new(
            Task::detect(),
            vec![Box::new(BBoxesComponent::default())],
            vec![
                Box::new(BBoxesComponent::default()),
                Box::new(LabelsComponent::default()),
            ],
        )
        .unwrap();
        assert_eq!(composite.len(), 2);
    }

    #[test]
    fn test_resolve_falls_back_to_parent() {
        let mut parent = Composite::new(Task::default(), Vec::new(), Vec::new()).unwrap();
        parent
            .add_components(vec![Box::new(SizeComponent::default())])
            .unwrap();
        let composite = detect(vec![Box::new(BBoxesComponent::default())]).unwrap();

        assert!(composite.resolve(Attr::Width, None).is_err());
        let size = composite.resolve(Attr::Width, Some(&parent)).unwrap();
        assert_eq!(size.capability(), "size");
    }

    #[test]
    fn test_reduce_mut_sees_peers() {
        let mut bboxes = BBoxesComponent::default();
        bboxes.add_bboxes([BBox::from_xyxy(0.0, 0.0, 1.0, 1.0)]);
        let mut composite = detect(vec![
            Box::new(bboxes),
            Box::new(LabelsComponent::default()),
        ])
        .unwrap();

        let seen = composite.reduce_mut(None, |component, peers| {
            (component.capability(), peers.resolve(Attr::BBoxes).is_some())
        });
        assert_eq!(seen, vec![("bbox", false), ("label", true)]);
    }

    #[test]
    fn test_remove_annotation_reaches_every_field() {
        let mut bboxes = BBoxesComponent::default();
        bboxes.add_bboxes([
            BBox::from_xyxy(0.0, 0.0, 1.0, 1.0),
            BBox::from_xyxy(2.0, 2.0, 3.0, 3.0),
        ]);
        let mut labels = LabelsComponent::default();
        labels.add_labels_names(&["a", "b"]);
        let mut composite = detect(vec![Box::new(bboxes), Box::new(labels)]).unwrap();

        composite.remove_annotation(0);

        let counts = composite.num_annotations();
        assert_eq!(counts["bboxes"], 1);
        assert_eq!(counts["labels"], 1);
        let labels = composite.find::<LabelsComponent>().unwrap();
        assert_eq!(labels.labels_names(), &["b".to_string()]);
    }

    #[test]
    fn test_merge_all_later_wins() {
        let merged = merge_all(vec![
            BTreeMap::from([("a", 1), ("b", 1)]),
            BTreeMap::from([("b", 2)]),
        ]);
        assert_eq!(merged, BTreeMap::from([("a", 1), ("b", 2)]));
    }
}
