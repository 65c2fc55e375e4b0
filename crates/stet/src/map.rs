//! Insertion-ordered map with per-entry source nodes.
//!
//! The map preserves entry positions across mutation: replacing a value
//! keeps its position, new keys append, removal keeps the remaining order.
//! Keys are any scalar-representable type ([`MapKey`]); equality compares
//! the scalar (wire) form, so typed newtype keys compare by their text.

use std::fmt;

use crate::node::NodeId;

/// A key type usable in an [`OrderedMap`]: convertible to and from its
/// scalar wire form.
pub trait MapKey: Clone {
    /// Wire form of the key, as it appears in the document.
    fn to_scalar(&self) -> String;

    /// Parses the wire form; `None` if the text is outside the value set.
    fn from_scalar(text: &str) -> Option<Self>
    where
        Self: Sized;

    /// Describes the expected value set in validation messages.
    fn expecting() -> &'static str {
        "a string key"
    }
}

impl MapKey for String {
    fn to_scalar(&self) -> String {
        self.clone()
    }

    fn from_scalar(text: &str) -> Option<Self> {
        Some(text.to_owned())
    }
}

/// One entry of an [`OrderedMap`], carrying the source nodes of its key and
/// value (when the entry came from a document).
#[derive(Debug, Clone, Default)]
pub struct MapEntry<K, V> {
    pub(crate) key: K,
    pub(crate) key_node: Option<NodeId>,
    pub(crate) value: V,
    pub(crate) value_node: Option<NodeId>,
}

impl<K, V> MapEntry<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }
}

/// Insertion-ordered map keyed by any scalar-convertible type.
#[derive(Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<MapEntry<K, V>>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_map()
            .entries(self.entries.iter().map(|entry| (&entry.key, &entry.value)))
            .finish()
    }
}

impl<K: MapKey, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, scalar: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.key.to_scalar() == scalar)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.position(&key.to_scalar()).is_some()
    }

    /// Returns the value for `key`, comparing scalar forms.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_str(&key.to_scalar())
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.position(&key.to_scalar())?;
        Some(&mut self.entries[index].value)
    }

    /// Lookup by the key's scalar form directly.
    pub fn get_str(&self, scalar: &str) -> Option<&V> {
        let index = self.position(scalar)?;
        Some(&self.entries[index].value)
    }

    /// Sets `key` to `value`. An existing entry keeps its position (and its
    /// source nodes); a new key appends. Returns the replaced value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.position(&key.to_scalar()) {
            Some(index) => {
                let entry = &mut self.entries[index];
                Some(std::mem::replace(&mut entry.value, value))
            }
            None => {
                self.entries.push(MapEntry {
                    key,
                    key_node: None,
                    value,
                    value_node: None,
                });
                None
            }
        }
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.position(&key.to_scalar())?;
        Some(self.entries.remove(index).value)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|entry| (&entry.key, &entry.value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> + '_ {
        self.entries
            .iter_mut()
            .map(|entry| (&entry.key, &mut entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.iter().map(|entry| &entry.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries.iter().map(|entry| &entry.value)
    }

    pub(crate) fn entries(&self) -> &[MapEntry<K, V>] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<MapEntry<K, V>> {
        &mut self.entries
    }

    pub(crate) fn push_entry(
        &mut self,
        key: K,
        key_node: Option<NodeId>,
        value: V,
        value_node: Option<NodeId>,
    ) {
        self.entries.push(MapEntry {
            key,
            key_node,
            value,
            value_node,
        });
    }

    /// Removes and returns the entry whose key has the given scalar form.
    pub(crate) fn take_entry_by_scalar(&mut self, scalar: &str) -> Option<MapEntry<K, V>> {
        let index = self.position(scalar)?;
        Some(self.entries.remove(index))
    }

    pub(crate) fn entry_by_scalar_mut(&mut self, scalar: &str) -> Option<&mut MapEntry<K, V>> {
        let index = self.position(scalar)?;
        Some(&mut self.entries[index])
    }
}

impl<K: MapKey, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K: MapKey, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.key.to_scalar() == b.key.to_scalar() && a.value == b.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("b".to_owned(), 2);
        map.insert("a".to_owned(), 1);
        map.insert("c".to_owned(), 3);
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn replacing_keeps_position() {
        let mut map: OrderedMap<String, i32> =
            [("a", 1), ("b", 2), ("c", 3)].map(|(k, v)| (k.to_owned(), v)).into_iter().collect();
        assert_eq!(map.insert("b".to_owned(), 20), Some(2));
        let entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(
            entries,
            [
                ("a".to_owned(), 1),
                ("b".to_owned(), 20),
                ("c".to_owned(), 3)
            ]
        );
    }

    #[test]
    fn removal_preserves_remaining_order() {
        let mut map: OrderedMap<String, i32> =
            [("a", 1), ("b", 2), ("c", 3)].map(|(k, v)| (k.to_owned(), v)).into_iter().collect();
        assert_eq!(map.remove(&"b".to_owned()), Some(2));
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, ["a", "c"]);
        assert!(map.get_str("b").is_none());
    }
}
