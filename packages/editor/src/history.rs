//! # Undo/Redo History
//!
//! Bounded, indexable list of deep tree snapshots plus a current index.
//!
//! ## Design
//!
//! - Every entry is an independent deep copy; `None` entries represent the
//!   empty tree.
//! - Caching while mid-undo truncates all newer entries first (standard
//!   linear undo/redo invalidation).
//! - Exceeding the capacity evicts the oldest entry and pins the index to
//!   the newest one.
//! - Consecutive structurally equal states are cached once.

use treelab_model::{ProcessTree, VariantElement};

pub const DEFAULT_CAPACITY: usize = 50;

/// Snapshot types storable in a [`History`].
///
/// `same_as` is the duplicate check used to skip caching identical
/// consecutive states. It compares structure only, so transient display
/// state (freeze flags, selection) never creates history entries.
pub trait Snapshot: Clone {
    fn same_as(&self, other: &Self) -> bool;
}

impl Snapshot for ProcessTree {
    fn same_as(&self, other: &Self) -> bool {
        self.structural_eq(other)
    }
}

impl Snapshot for VariantElement {
    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

#[derive(Debug)]
pub struct History<T: Snapshot> {
    entries: Vec<Option<T>>,
    index: usize,
    capacity: usize,
}

impl<T: Snapshot> History<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// History holding at most `capacity` snapshots. The initial entry is
    /// the empty tree.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: vec![None],
            index: 0,
            capacity: capacity.max(2),
        }
    }

    /// Cache the current state. Skipped when it is structurally equal to
    /// the snapshot at the current index.
    pub fn cache(&mut self, candidate: Option<&T>) {
        match (candidate, self.entries[self.index].as_ref()) {
            (None, None) => return,
            (Some(c), Some(current)) if c.same_as(current) => return,
            _ => {}
        }

        if self.index < self.entries.len() - 1 {
            // mid-undo: the older version was changed, newer entries are invalid
            self.entries.truncate(self.index + 1);
        }

        self.entries.push(candidate.cloned());

        if self.entries.len() > self.capacity {
            self.entries.remove(0);
            self.index = self.entries.len() - 1;
        } else {
            self.index += 1;
        }
    }

    /// Step back and return a deep copy of the previous snapshot. Outer
    /// `None` means there is nothing to undo; an inner `None` restores the
    /// empty tree.
    pub fn undo(&mut self) -> Option<Option<T>> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.entries[self.index].clone())
    }

    /// Step forward and return a deep copy of the next snapshot.
    pub fn redo(&mut self) -> Option<Option<T>> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(self.entries[self.index].clone())
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Drop all snapshots and reset to the empty state.
    pub fn clear(&mut self) {
        self.entries = vec![None];
        self.index = 0;
    }
}

impl<T: Snapshot> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treelab_model::ProcessTree;

    fn leaf_tree(id: u64, label: &str) -> ProcessTree {
        ProcessTree::new_leaf(id, label)
    }

    #[test]
    fn test_cache_and_undo_redo() {
        let mut history: History<ProcessTree> = History::new();
        let a = leaf_tree(1, "a");
        let b = leaf_tree(2, "b");

        history.cache(Some(&a));
        history.cache(Some(&b));

        assert!(history.can_undo());
        let restored = history.undo().unwrap().unwrap();
        assert!(restored.structural_eq(&a));

        let redone = history.redo().unwrap().unwrap();
        assert!(redone.structural_eq(&b));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_duplicate_states_cached_once() {
        let mut history: History<ProcessTree> = History::new();
        let a = leaf_tree(1, "a");

        history.cache(Some(&a));
        history.cache(Some(&a.clone()));

        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_frozen_change_is_not_a_new_entry() {
        let mut history: History<ProcessTree> = History::new();
        let mut a = leaf_tree(1, "a");

        history.cache(Some(&a));
        a.frozen = true;
        history.cache(Some(&a));

        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_truncate_on_diverge() {
        let mut history: History<ProcessTree> = History::new();
        history.cache(Some(&leaf_tree(1, "a")));
        history.cache(Some(&leaf_tree(2, "b")));
        history.cache(Some(&leaf_tree(3, "c")));

        history.undo();
        history.undo();
        history.cache(Some(&leaf_tree(4, "d")));

        // entries are now: empty, a, d (b and c were invalidated)
        assert_eq!(history.len(), 3);
        assert!(!history.can_redo());
        let restored = history.undo().unwrap().unwrap();
        assert!(restored.structural_eq(&leaf_tree(1, "a")));
    }

    #[test]
    fn test_eviction_pins_index_to_newest() {
        let mut history: History<ProcessTree> = History::with_capacity(3);
        history.cache(Some(&leaf_tree(1, "a")));
        history.cache(Some(&leaf_tree(2, "b")));
        history.cache(Some(&leaf_tree(3, "c")));
        history.cache(Some(&leaf_tree(4, "d")));

        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), history.len() - 1);
        let restored = history.undo().unwrap().unwrap();
        assert!(restored.structural_eq(&leaf_tree(3, "c")));
    }

    #[test]
    fn test_undo_to_empty_state() {
        let mut history: History<ProcessTree> = History::new();
        history.cache(Some(&leaf_tree(1, "a")));

        let restored = history.undo().unwrap();
        assert!(restored.is_none());
        assert!(!history.can_undo());
        assert!(history.undo().is_none());
    }
}
