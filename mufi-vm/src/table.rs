use std::collections::HashMap;

use crate::object::ObjRef;
use crate::value::Value;

/// Global variable bindings keyed by interned name.
///
/// Presence of a key is the only "is defined" test.
#[derive(Debug, Default)]
pub struct Table {
    entries: HashMap<ObjRef, Value>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key`, overwriting any previous binding.
    pub fn define(&mut self, key: ObjRef, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: ObjRef) -> Option<Value> {
        self.entries.get(&key).copied()
    }

    /// Insert or overwrite. Returns `true` when the key was not present before.
    pub fn set(&mut self, key: ObjRef, value: Value) -> bool {
        self.entries.insert(key, value).is_none()
    }

    pub fn delete(&mut self, key: ObjRef) -> bool {
        self.entries.remove(&key).is_some()
    }

    pub fn contains(&self, key: ObjRef) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
