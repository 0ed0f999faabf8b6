//! Depth-ordered update scheduling
//!
//! [`UpdateHelper`] records which objects need `update()` in one pass and at
//! which depth of the dependency graph they were found. Leaves (objects with
//! no object-valued dependencies) live in their own bucket. Running leaves
//! first and then each depth from deepest to shallowest guarantees every
//! object's dependencies have been updated before it is.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::error::RdlResult;
use crate::object::ObjectRef;

/// Depth reported for an object that was never recorded
pub const DEPTH_UNRECORDED: i32 = -2;
/// Depth reported for a leaf
pub const DEPTH_LEAF: i32 = -1;

/// Objects scheduled for update, bucketed by dependency depth
#[derive(Debug, Default)]
pub struct UpdateHelper {
    levels: Vec<HashSet<ObjectRef>>,
    leaves: Vec<ObjectRef>,
    depths: HashMap<ObjectRef, i32>,
}

impl UpdateHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `object` at `depth`, keeping the deepest depth seen
    ///
    /// # Panics
    ///
    /// If `depth` is negative or `object` was recorded as a leaf.
    pub fn insert(&mut self, object: ObjectRef, depth: i32) {
        assert!(depth >= 0, "UpdateHelper::insert() requires a non-negative depth, got {}", depth);
        let previous = self.get_depth(&object);
        assert!(
            previous != DEPTH_LEAF,
            "SceneObject '{}' is already recorded as a leaf and cannot be inserted at depth {}",
            object.name(),
            depth
        );
        if previous >= depth {
            return;
        }
        if previous >= 0 {
            self.levels[previous as usize].remove(&object);
        }

        let level = depth as usize;
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, HashSet::new);
        }
        self.levels[level].insert(object.clone());
        self.depths.insert(object, depth);
    }

    /// Record `object` as a leaf; repeated calls are ignored
    ///
    /// # Panics
    ///
    /// If `object` was recorded at a depth.
    pub fn insert_leaf(&mut self, object: ObjectRef) {
        let previous = self.get_depth(&object);
        assert!(
            previous < 0,
            "SceneObject '{}' is already recorded at depth {} and cannot be a leaf",
            object.name(),
            previous
        );
        if previous == DEPTH_LEAF {
            return;
        }
        self.leaves.push(object.clone());
        self.depths.insert(object, DEPTH_LEAF);
    }

    /// Recorded depth, [`DEPTH_LEAF`], or [`DEPTH_UNRECORDED`]
    pub fn get_depth(&self, object: &ObjectRef) -> i32 {
        self.depths.get(object).copied().unwrap_or(DEPTH_UNRECORDED)
    }

    pub fn is_leaf(&self, object: &ObjectRef) -> bool {
        self.get_depth(object) == DEPTH_LEAF
    }

    /// Number of depth buckets
    pub fn max_depth(&self) -> usize {
        self.levels.len()
    }

    /// Objects at `depth`
    pub fn size(&self, depth: usize) -> usize {
        self.levels.get(depth).map_or(0, HashSet::len)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn leaves(&self) -> &[ObjectRef] {
        &self.leaves
    }

    /// Objects at `depth` in no particular order
    pub fn level(&self, depth: usize) -> impl Iterator<Item = &ObjectRef> {
        self.levels.get(depth).into_iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
        self.leaves.clear();
        self.depths.clear();
    }

    /// Hand each batch to `run`: leaves, then depths deepest first
    ///
    /// Objects within one batch are independent of each other, so `run` may
    /// process them concurrently. The next batch starts only after `run`
    /// returns.
    pub fn run_updates(&self, mut run: impl FnMut(&[ObjectRef]) -> RdlResult<()>) -> RdlResult<()> {
        match self.leaves.len() {
            0 => info!("There is no leaf scene object need to be updated"),
            1 => info!("Updating 1 leaf scene object..."),
            n => info!("Updating {} leaf scene objects...", n),
        }
        run(&self.leaves)?;

        for depth in (0..self.levels.len()).rev() {
            let batch: Vec<ObjectRef> = self.levels[depth].iter().cloned().collect();
            match batch.len() {
                0 => info!("There is no scene object need to be updated at level {}", depth),
                1 => info!("Updating 1 scene object at level {}...", depth),
                n => info!("Updating {} scene objects at level {}...", n, depth),
            }
            run(&batch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{plain_class, plain_object};

    #[test]
    fn test_unrecorded_depth() {
        let class = plain_class("Plain");
        let a = plain_object(&class, "a");
        let helper = UpdateHelper::new();
        assert_eq!(helper.get_depth(&a), DEPTH_UNRECORDED);
        assert!(!helper.is_leaf(&a));
        assert_eq!(helper.max_depth(), 0);
        assert!(helper.is_empty());
    }

    #[test]
    fn test_deepest_depth_wins() {
        let class = plain_class("Plain");
        let a = plain_object(&class, "a");

        let mut helper = UpdateHelper::new();
        helper.insert(a.clone(), 1);
        helper.insert(a.clone(), 3);
        helper.insert(a.clone(), 2);
        assert_eq!(helper.get_depth(&a), 3);
        assert_eq!(helper.size(1), 0);
        assert_eq!(helper.size(3), 1);
        assert_eq!(helper.max_depth(), 4);

        let mut reversed = UpdateHelper::new();
        reversed.insert(a.clone(), 3);
        reversed.insert(a.clone(), 1);
        assert_eq!(reversed.get_depth(&a), 3);
        assert_eq!(reversed.size(1), 0);
    }

    #[test]
    fn test_leaves_are_idempotent() {
        let class = plain_class("Plain");
        let a = plain_object(&class, "a");

        let mut helper = UpdateHelper::new();
        helper.insert_leaf(a.clone());
        helper.insert_leaf(a.clone());
        assert_eq!(helper.leaf_count(), 1);
        assert!(helper.is_leaf(&a));
        assert_eq!(helper.get_depth(&a), DEPTH_LEAF);

        helper.clear();
        assert_eq!(helper.get_depth(&a), DEPTH_UNRECORDED);
        assert_eq!(helper.leaf_count(), 0);
    }

    #[test]
    #[should_panic(expected = "already recorded as a leaf")]
    fn test_leaf_then_depth_panics() {
        let class = plain_class("Plain");
        let a = plain_object(&class, "a");
        let mut helper = UpdateHelper::new();
        helper.insert_leaf(a.clone());
        helper.insert(a, 0);
    }

    #[test]
    #[should_panic(expected = "cannot be a leaf")]
    fn test_depth_then_leaf_panics() {
        let class = plain_class("Plain");
        let a = plain_object(&class, "a");
        let mut helper = UpdateHelper::new();
        helper.insert(a.clone(), 2);
        helper.insert_leaf(a);
    }

    #[test]
    #[should_panic(expected = "non-negative depth")]
    fn test_negative_depth_panics() {
        let class = plain_class("Plain");
        let mut helper = UpdateHelper::new();
        helper.insert(plain_object(&class, "a"), -1);
    }

    #[test]
    fn test_run_updates_order() {
        let class = plain_class("Plain");
        let leaf = plain_object(&class, "leaf");
        let deep = plain_object(&class, "deep");
        let shallow = plain_object(&class, "shallow");

        let mut helper = UpdateHelper::new();
        helper.insert(shallow.clone(), 0);
        helper.insert(deep.clone(), 2);
        helper.insert_leaf(leaf.clone());

        let mut order = Vec::new();
        helper
            .run_updates(|batch| {
                order.extend(batch.iter().map(|o| o.name().to_string()));
                Ok(())
            })
            .unwrap();
        assert_eq!(order, vec!["leaf", "deep", "shallow"]);
    }
}
