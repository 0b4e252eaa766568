//! Capability registry.
//!
//! A capability is a named behavior ("bbox", "label", ...). Each capability is
//! declared once, and every concrete component kind is attached to exactly one
//! capability by an explicit [`Registry::register`] call. Nothing is discovered
//! implicitly; [`Registry::builtin`] is the startup table for the components
//! shipped with this crate.

use std::collections::HashMap;
use std::fmt;

use crate::component::{
    AreasComponent, BBoxesComponent, ClassMapComponent, Component, FilepathComponent,
    ImageComponent, ImageIdComponent, IsCrowdsComponent, KeyPointsComponent, LabelsComponent,
    MasksComponent, ScoresComponent, SizeComponent,
};
use crate::error::RecordError;
use crate::task::Task;

/// Root of every component kind that can live in a record.
pub const RECORD_COMPONENT: KindId = KindId::new("RecordComponent");

/// Stable identifier of a concrete component kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KindId(&'static str);

impl KindId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Builds a fresh component; `None` means "use the kind's own default task".
pub type Constructor = fn(Option<Task>) -> Box<dyn Component>;

/// Descriptor of a component kind: its id, the kinds it specializes, and an
/// optional constructor.
#[derive(Clone, Copy, Debug)]
pub struct ComponentKind {
    pub id: KindId,
    pub supertypes: &'static [KindId],
    pub build: Option<Constructor>,
}

impl ComponentKind {
    pub const fn new(id: KindId, supertypes: &'static [KindId]) -> Self {
        Self {
            id,
            supertypes,
            build: None,
        }
    }

    pub const fn with_constructor(mut self, build: Constructor) -> Self {
        self.build = Some(build);
        self
    }

    /// A kind is a subtype of itself and of every declared supertype.
    pub fn is_subtype_of(&self, base: KindId) -> bool {
        self.id == base || self.supertypes.contains(&base)
    }

    pub fn construct(&self, task: Option<Task>) -> Option<Box<dyn Component>> {
        self.build.map(|build| build(task))
    }
}

/// Registration handle returned by [`Registry::declare`].
///
/// Kinds attached through the handle always land under the name it was
/// declared with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capability {
    name: String,
}

impl Capability {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches `kind` to this capability.
    pub fn register(&self, registry: &mut Registry, kind: ComponentKind) -> Result<(), RecordError> {
        registry.register(kind, &self.name)
    }
}

/// Table of capability name -> component kinds registered under it.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    declared: Vec<String>,
    kinds: HashMap<String, Vec<ComponentKind>>,
    kind_names: HashMap<KindId, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new capability name.
    ///
    /// # Errors
    /// Returns [`RecordError::RegistrationConflict`] if the name exists.
    pub fn declare(&mut self, name: &str) -> Result<Capability, RecordError> {
        if self.kinds.contains_key(name) {
            return Err(RecordError::RegistrationConflict(name.to_string()));
        }
        self.kinds.insert(name.to_string(), Vec::new());
        self.declared.push(name.to_string());
        Ok(Capability {
            name: name.to_string(),
        })
    }

    /// Attaches a component kind to a declared capability.
    pub fn register(&mut self, kind: ComponentKind, capability: &str) -> Result<(), RecordError> {
        if let Some(existing) = self.kind_names.get(&kind.id) {
            return Err(RecordError::KindAlreadyRegistered {
                kind: kind.id.to_string(),
                capability: existing.clone(),
            });
        }
        let kinds = self
            .kinds
            .get_mut(capability)
            .ok_or_else(|| RecordError::UnknownCapability(capability.to_string()))?;
        kinds.push(kind);
        self.kind_names.insert(kind.id, capability.to_string());
        Ok(())
    }

    /// Capability names in declaration order.
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    pub fn kinds(&self, capability: &str) -> &[ComponentKind] {
        self.kinds.get(capability).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn capability_of(&self, kind: KindId) -> Option<&str> {
        self.kind_names.get(&kind).map(String::as_str)
    }

    /// Every registered kind that shares a capability with one of
    /// `components` and is a subtype of `base`.
    ///
    /// Components whose kind was never registered contribute nothing.
    pub fn resolve(&self, base: KindId, components: &[&dyn Component]) -> Vec<&ComponentKind> {
        let mut names: Vec<&str> = Vec::new();
        for component in components {
            if let Some(name) = self.capability_of(component.kind()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        names
            .into_iter()
            .flat_map(|name| self.kinds(name))
            .filter(|kind| kind.is_subtype_of(base))
            .collect()
    }

    /// First constructible kind under `capability` that specializes `base`.
    pub fn constructor(&self, capability: &str, base: KindId) -> Result<&ComponentKind, RecordError> {
        if !self.kinds.contains_key(capability) {
            return Err(RecordError::UnknownCapability(capability.to_string()));
        }
        self.kinds(capability)
            .iter()
            .find(|kind| kind.build.is_some() && kind.is_subtype_of(base))
            .ok_or_else(|| RecordError::UnknownCapability(capability.to_string()))
    }

    /// Registry holding every component kind shipped with this crate.
    pub fn builtin() -> Result<Self, RecordError> {
        let mut registry = Self::new();

        let imageid = registry.declare("imageid")?;
        let size = registry.declare("size")?;
        let filepath = registry.declare("filepath")?;
        let image = registry.declare("image")?;
        let classmap = registry.declare("classmap")?;
        let label = registry.declare("label")?;
        let bbox = registry.declare("bbox")?;
        let mask = registry.declare("mask")?;
        let area = registry.declare("area")?;
        let iscrowd = registry.declare("iscrowd")?;
        let keypoint = registry.declare("keypoint")?;
        let score = registry.declare("score")?;

        imageid.register(&mut registry, ImageIdComponent::KIND)?;
        size.register(&mut registry, SizeComponent::KIND)?;
        filepath.register(&mut registry, FilepathComponent::KIND)?;
        image.register(&mut registry, ImageComponent::KIND)?;
        classmap.register(&mut registry, ClassMapComponent::KIND)?;
        label.register(&mut registry, LabelsComponent::KIND)?;
        bbox.register(&mut registry, BBoxesComponent::KIND)?;
        mask.register(&mut registry, MasksComponent::KIND)?;
        area.register(&mut registry, AreasComponent::KIND)?;
        iscrowd.register(&mut registry, IsCrowdsComponent::KIND)?;
        keypoint.register(&mut registry, KeyPointsComponent::KIND)?;
        score.register(&mut registry, ScoresComponent::KIND)?;

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARSER: KindId = KindId::new("Parser");
    const BBOX_PARSER: ComponentKind =
        ComponentKind::new(KindId::new("BBoxesParser"), &[PARSER]);

    #[test]
    fn test_declare_twice_conflicts() {
        let mut registry = Registry::new();
        registry.declare("bbox").unwrap();
        let err = registry.declare("bbox").unwrap_err();
        assert!(matches!(err, RecordError::RegistrationConflict(name) if name == "bbox"));
    }

    #[test]
    fn test_register_requires_declared_name() {
        let mut registry = Registry::new();
        let err = registry.register(BBOX_PARSER, "bbox").unwrap_err();
        assert!(matches!(err, RecordError::UnknownCapability(_)));
    }

    #[test]
    fn test_declared_handle_registers_under_its_name() {
        let mut registry = Registry::new();
        let bbox = registry.declare("bbox").unwrap();
        bbox.register(&mut registry, BBOX_PARSER).unwrap();
        assert_eq!(registry.capability_of(BBOX_PARSER.id), Some("bbox"));
        assert_eq!(registry.kinds("bbox").len(), 1);
    }

    #[test]
    fn test_kind_attaches_to_one_name() {
        let mut registry = Registry::new();
        registry.declare("bbox").unwrap();
        registry.declare("mask").unwrap();
        registry.register(BBOX_PARSER, "bbox").unwrap();
        let err = registry.register(BBOX_PARSER, "mask").unwrap_err();
        assert!(matches!(err, RecordError::KindAlreadyRegistered { .. }));
    }

    #[test]
    fn test_resolve_matches_capability_and_base() {
        let mut registry = Registry::builtin().unwrap();
        registry.register(BBOX_PARSER, "bbox").unwrap();

        let bboxes = BBoxesComponent::default();
        let labels = LabelsComponent::default();
        let components: [&dyn Component; 2] = [&bboxes, &labels];

        let parsers = registry.resolve(PARSER, &components);
        assert_eq!(parsers.len(), 1);
        assert_eq!(parsers[0].id, BBOX_PARSER.id);

        let record_kinds: Vec<KindId> = registry
            .resolve(RECORD_COMPONENT, &components)
            .into_iter()
            .map(|kind| kind.id)
            .collect();
        assert_eq!(
            record_kinds,
            vec![BBoxesComponent::KIND.id, LabelsComponent::KIND.id]
        );
    }

    #[test]
    fn test_filepath_specializes_image() {
        assert!(FilepathComponent::KIND.is_subtype_of(ImageComponent::KIND.id));
        assert!(!ImageComponent::KIND.is_subtype_of(FilepathComponent::KIND.id));
    }

    #[test]
    fn test_builtin_capabilities_in_declaration_order() {
        let registry = Registry::builtin().unwrap();
        let names: Vec<&str> = registry.capabilities().collect();
        assert_eq!(names.first(), Some(&"imageid"));
        assert_eq!(names.len(), 12);
        assert_eq!(registry.capability_of(MasksComponent::KIND.id), Some("mask"));
    }
}
