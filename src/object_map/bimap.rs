use std::hash::Hash;

use ahash::AHashMap;

/// Bidirectional map whose two directions are always mutual inverses.
///
/// A key and a value each appear in at most one pair. [`insert`](BiMap::insert) is
/// last-write-wins on both sides: the pair it replaces is retired from the other direction.
#[derive(Debug, Clone)]
pub struct BiMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    forward: AHashMap<K, V>,
    reverse: AHashMap<V, K>,
}

impl<K, V> Default for BiMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> BiMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            forward: AHashMap::new(),
            reverse: AHashMap::new(),
        }
    }

    /// Insert a pair, replacing any pair that shares its key or its value.
    ///
    /// Arguments
    /// -----------------
    /// * `key`: the forward key.
    /// * `value`: the backward key.
    ///
    /// Return
    /// ----------
    /// * The pairs that were retired by this insertion, as `(stale value of key, stale key of value)`.
    pub fn insert(&mut self, key: K, value: V) -> (Option<V>, Option<K>) {
        let stale_value = match self.forward.insert(key.clone(), value.clone()) {
            Some(old) if old != value => {
                self.reverse.remove(&old);
                Some(old)
            }
            _ => None,
        };

        let stale_key = match self.reverse.insert(value, key.clone()) {
            Some(old) if old != key => {
                self.forward.remove(&old);
                Some(old)
            }
            _ => None,
        };

        (stale_value, stale_key)
    }

    pub fn get_by_key(&self, key: &K) -> Option<&V> {
        self.forward.get(key)
    }

    pub fn get_by_value(&self, value: &V) -> Option<&K> {
        self.reverse.get(value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.forward.contains_key(key)
    }

    pub fn remove_by_key(&mut self, key: &K) -> Option<V> {
        let val = self.forward.remove(key)?;
        self.reverse.remove(&val);
        Some(val)
    }

    pub fn remove_by_value(&mut self, value: &V) -> Option<K> {
        let key = self.reverse.remove(value)?;
        self.forward.remove(&key);
        Some(key)
    }

    pub fn iter_forward(&self) -> impl Iterator<Item = (&K, &V)> {
        self.forward.iter()
    }

    pub fn iter_backward(&self) -> impl Iterator<Item = (&V, &K)> {
        self.reverse.iter()
    }

    /// Drop every pair, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that both directions describe the same set of pairs.
    pub fn is_consistent(&self) -> bool {
        self.forward.len() == self.reverse.len()
            && self
                .forward
                .iter()
                .all(|(k, v)| self.reverse.get(v) == Some(k))
    }
}
