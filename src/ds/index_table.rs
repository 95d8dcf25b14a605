//! Key → handle index kept in bijection with a [`RecencyQueue`](super::RecencyQueue).

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::slot_arena::SlotId;

#[derive(Debug, Clone)]
pub struct IndexTable<K> {
    map: FxHashMap<K, SlotId>,
}

impl<K> IndexTable<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn get(&self, key: &K) -> Option<SlotId> {
        self.map.get(key).copied()
    }

    /// Returns the stored key equal to `key` together with its handle.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, SlotId)> {
        self.map.get_key_value(key).map(|(k, id)| (k, *id))
    }

    /// Indexes `key`, returning the handle it previously mapped to.
    pub fn insert(&mut self, key: K, id: SlotId) -> Option<SlotId> {
        self.map.insert(key, id)
    }

    pub fn remove(&mut self, key: &K) -> Option<SlotId> {
        self.map.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, SlotId)> {
        self.map.iter().map(|(k, id)| (k, *id))
    }
}

impl<K> Default for IndexTable<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut index = IndexTable::new();
        assert_eq!(index.insert("a", SlotId(0)), None);
        assert_eq!(index.insert("b", SlotId(1)), None);
        assert_eq!(index.get(&"a"), Some(SlotId(0)));
        assert_eq!(index.len(), 2);

        assert_eq!(index.insert("a", SlotId(4)), Some(SlotId(0)));
        assert_eq!(index.remove(&"a"), Some(SlotId(4)));
        assert!(!index.contains(&"a"));
        assert_eq!(index.remove(&"a"), None);
    }

    #[test]
    fn get_key_value_returns_stored_key() {
        let mut index = IndexTable::with_capacity(1);
        let stored = String::from("key");
        let stored_ptr = stored.as_ptr();
        index.insert(stored, SlotId(3));

        let probe = String::from("key");
        let (key, id) = index.get_key_value(&probe).unwrap();
        assert_eq!(key.as_ptr(), stored_ptr);
        assert_eq!(id, SlotId(3));
    }

    #[test]
    fn clear_empties_index() {
        let mut index = IndexTable::new();
        index.insert(1u32, SlotId(0));
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.iter().count(), 0);
    }
}
