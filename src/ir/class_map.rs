//! Bidirectional lookup between class ids and class names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

use super::ids::ClassId;

/// Name used for id 0 by [`ClassMap::with_background`].
pub const BACKGROUND: &str = "background";

/// Ordered table of class names; a class id is its position in the table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassMap {
    names: Vec<String>,
    ids: HashMap<String, ClassId>,
}

impl ClassMap {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut class_map = Self::default();
        for name in classes {
            class_map.add_name(name);
        }
        class_map
    }

    /// Like [`ClassMap::new`], but reserves id 0 for [`BACKGROUND`].
    pub fn with_background<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut class_map = Self::new([BACKGROUND]);
        for name in classes {
            class_map.add_name(name);
        }
        class_map
    }

    pub fn get_by_id(&self, id: ClassId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn get_by_name(&self, name: &str) -> Option<ClassId> {
        self.ids.get(name).copied()
    }

    /// Adds a class if absent and returns its id.
    pub fn add_name(&mut self, name: impl Into<String>) -> ClassId {
        let name = name.into();
        if let Some(id) = self.ids.get(&name) {
            return *id;
        }
        let id = ClassId::new(self.names.len());
        self.ids.insert(name.clone(), id);
        self.names.push(name);
        id
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Serialize for ClassMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.names.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClassMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(ClassMap::new(names))
    }
}
