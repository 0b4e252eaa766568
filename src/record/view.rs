//! Map-style access to a record by serialized key.
//!
//! Keys are the ones [`Record::serialize`] produces for the default task.
//! Writes and deletes route through the owning component, so a record never
//! holds a value its components did not accept.

use serde_json::Value;

use super::Record;
use crate::component::Attr;
use crate::error::RecordError;

impl Record {
    /// Value under `key`.
    ///
    /// # Errors
    /// [`RecordError::UnknownKey`] if no default-task component serializes it.
    pub fn get_key(&self, key: &str) -> Result<Value, RecordError> {
        self.serialize()
            .remove(key)
            .ok_or_else(|| RecordError::UnknownKey(key.to_string()))
    }

    /// Assigns `value` through the setter of the component owning `key`.
    pub fn set_key(&mut self, key: &str, value: Value) -> Result<(), RecordError> {
        let attr: Attr = key.parse()?;
        self.set(attr, value)
    }

    /// Resets the attribute behind `key` to its empty state.
    pub fn remove_key(&mut self, key: &str) -> Result<(), RecordError> {
        let attr: Attr = key.parse()?;
        let task = self.default.task().name().to_string();
        self.default
            .resolve_local_mut(attr)
            .ok_or(RecordError::AttributeResolution { attr, task })?
            .clear(attr)
    }

    pub fn keys(&self) -> Vec<String> {
        self.serialize().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.serialize().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
