//! Insertion-ordered set with swap-remove deletion.
//!
//! Removing an element moves the last element into the freed slot, so
//! iteration order after a removal is not insertion order. Queries over
//! candidate lists and production buckets expose that order as-is.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(
    serialize = "T: Serialize + Clone + Eq + Hash",
    deserialize = "T: Deserialize<'de> + Clone + Eq + Hash"
))]
pub struct IndexedSet<T: Clone + Eq + Hash> {
    items: Vec<T>,
    positions: HashMap<T, usize>,
}

impl<T: Clone + Eq + Hash> IndexedSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Append `item`. Returns false if it was already present.
    pub fn insert(&mut self, item: T) -> bool {
        if self.positions.contains_key(&item) {
            return false;
        }
        self.positions.insert(item.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Remove `item`, filling its slot with the last element.
    /// Returns false if it was absent.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(index) = self.positions.remove(item) else {
            return false;
        };
        self.items.swap_remove(index);
        if let Some(moved) = self.items.get(index) {
            self.positions.insert(moved.clone(), index);
        }
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone + Eq + Hash> Default for IndexedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> PartialEq for IndexedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Clone + Eq + Hash> Eq for IndexedSet<T> {}

impl<T: Clone + Eq + Hash> From<Vec<T>> for IndexedSet<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Clone + Eq + Hash> From<IndexedSet<T>> for Vec<T> {
    fn from(set: IndexedSet<T>) -> Self {
        set.items
    }
}

impl<T: Clone + Eq + Hash> FromIterator<T> for IndexedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<'a, T: Clone + Eq + Hash> IntoIterator for &'a IndexedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
