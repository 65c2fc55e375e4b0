//! Specification extensions (`x-*` keys).
//!
//! Extensions are an ordered key → [`Value`] map. Keys routed here at load
//! time are stored as [`Value::Raw`] nodes and never interpreted, so
//! arbitrary user content round-trips untouched. Values set by the
//! application are materialized into nodes at sync time.

use crate::{
    map::OrderedMap,
    node::NodeId,
    value::Value,
};

/// Ordered sink/source for `x-*` keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions {
    map: OrderedMap<String, Value>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.get_str(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get_str(key)
    }

    /// Sets `key` to `value`. Existing keys keep their position; new keys
    /// append. Keys should match the `x-*` convention; anything else would
    /// collide with declared fields on output.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.map.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.take_entry_by_scalar(key).map(|entry| entry.value)
    }

    /// Iterates `(key, value)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> + '_ {
        self.map.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> + '_ {
        self.map.keys()
    }

    pub(crate) fn insert_loaded(&mut self, key: String, key_node: NodeId, value_node: NodeId) {
        self.map
            .push_entry(key, Some(key_node), Value::Raw(value_node), Some(value_node));
    }

    pub(crate) fn map(&self) -> &OrderedMap<String, Value> {
        &self.map
    }

    pub(crate) fn map_mut(&mut self) -> &mut OrderedMap<String, Value> {
        &mut self.map
    }
}
