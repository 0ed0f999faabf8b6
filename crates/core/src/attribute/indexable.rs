//! Sequence with a reverse index from value to positions

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Deref;

/// A vector that also remembers where each value appears
///
/// Used for large object lists (geometry sets, trace sets) where callers
/// need "at which indices does this object occur" without a linear scan.
/// Duplicate entries are allowed; each keeps its own index.
#[derive(Clone)]
pub struct IndexableArray<T: Eq + Hash + Clone> {
    items: Vec<T>,
    positions: HashMap<T, Vec<usize>>,
}

impl<T: Eq + Hash + Clone> IndexableArray<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn push(&mut self, value: T) {
        self.positions
            .entry(value.clone())
            .or_default()
            .push(self.items.len());
        self.items.push(value);
    }

    /// Replace the value at `index`, returning the old one
    pub fn set(&mut self, index: usize, value: T) -> T {
        let old = std::mem::replace(&mut self.items[index], value.clone());
        self.unindex(&old, index);
        let slots = self.positions.entry(value).or_default();
        let at = slots.partition_point(|&i| i < index);
        slots.insert(at, index);
        old
    }

    /// Remove the value at `index`, shifting later entries down
    pub fn remove(&mut self, index: usize) -> T {
        let old = self.items.remove(index);
        self.unindex(&old, index);
        for slots in self.positions.values_mut() {
            for i in slots.iter_mut().filter(|i| **i > index) {
                *i -= 1;
            }
        }
        old
    }

    /// Positions at which `value` occurs, in ascending order
    pub fn indices_of(&self, value: &T) -> &[usize] {
        self.positions.get(value).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, value: &T) -> bool {
        self.positions.contains_key(value)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    fn unindex(&mut self, value: &T, index: usize) {
        if let Some(slots) = self.positions.get_mut(value) {
            slots.retain(|&i| i != index);
            if slots.is_empty() {
                self.positions.remove(value);
            }
        }
    }
}

impl<T: Eq + Hash + Clone> Default for IndexableArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> Deref for IndexableArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: Eq + Hash + Clone> PartialEq for IndexableArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq + Hash + Clone + std::fmt::Debug> std::fmt::Debug for IndexableArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for IndexableArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        for value in iter {
            array.push(value);
        }
        array
    }
}

impl<T: Eq + Hash + Clone> From<Vec<T>> for IndexableArray<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<'a, T: Eq + Hash + Clone> IntoIterator for &'a IndexableArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_keep_every_position() {
        let array: IndexableArray<&str> = vec!["a", "b", "a", "c"].into();
        assert_eq!(array.len(), 4);
        assert_eq!(array.indices_of(&"a"), &[0, 2]);
        assert_eq!(array.indices_of(&"c"), &[3]);
        assert!(array.indices_of(&"z").is_empty());
    }

    #[test]
    fn test_set_reindexes() {
        let mut array: IndexableArray<&str> = vec!["a", "b", "a"].into();
        let old = array.set(2, "b");
        assert_eq!(old, "a");
        assert_eq!(array.indices_of(&"a"), &[0]);
        assert_eq!(array.indices_of(&"b"), &[1, 2]);

        array.set(0, "c");
        assert!(!array.contains(&"a"));
        assert_eq!(array.as_slice(), &["c", "b", "b"]);
    }

    #[test]
    fn test_remove_shifts_positions() {
        let mut array: IndexableArray<&str> = vec!["a", "b", "c", "b"].into();
        assert_eq!(array.remove(1), "b");
        assert_eq!(array.as_slice(), &["a", "c", "b"]);
        assert_eq!(array.indices_of(&"b"), &[2]);
        assert_eq!(array.indices_of(&"c"), &[1]);
        assert_eq!(array.indices_of(&"a"), &[0]);
    }

    #[test]
    fn test_equality_ignores_index_details() {
        let a: IndexableArray<i32> = vec![1, 2, 3].into();
        let mut b = IndexableArray::new();
        b.push(1);
        b.push(2);
        b.push(3);
        assert_eq!(a, b);
        b.clear();
        assert!(b.is_empty());
        assert_ne!(a, b);
    }
}
