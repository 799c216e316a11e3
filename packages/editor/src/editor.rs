//! # Process Tree Editor
//!
//! Owns the live tree, its undo/redo history, and the copy/paste buffer.
//!
//! All structural mutation of a process tree goes through this type. Every
//! operation re-validates its preconditions before touching the tree, so a
//! rejected edit never leaves a partially mutated state. Successful edits
//! are cached into the history; freeze toggles are not; freeze state is
//! carried across snapshots by id instead (see [`TreeEditor::undo`]).

use std::collections::BTreeSet;

use treelab_model::integrity::{check_syntax, unknown_activities, SyntaxReport};
use treelab_model::transform::{activity_set, rename_activity};
use treelab_model::{IdGenerator, Operator, ProcessTree};

use crate::edits::{InsertPositions, InsertStrategy, NodeSpec, TreeEdit};
use crate::errors::EditError;
use crate::history::History;

pub struct TreeEditor {
    root: Option<ProcessTree>,
    history: History<ProcessTree>,
    buffer: Option<ProcessTree>,
    ids: IdGenerator,
}

impl TreeEditor {
    /// Editor over an empty tree.
    pub fn new() -> Self {
        Self {
            root: None,
            history: History::new(),
            buffer: None,
            ids: IdGenerator::new(),
        }
    }

    /// Editor over an existing tree. Fresh node ids are allocated above the
    /// ids already present.
    pub fn from_tree(tree: ProcessTree) -> Self {
        let mut editor = Self {
            ids: IdGenerator::seeded_from(&tree),
            root: Some(tree),
            history: History::new(),
            buffer: None,
        };
        editor.cache();
        editor
    }

    pub fn root(&self) -> Option<&ProcessTree> {
        self.root.as_ref()
    }

    pub fn buffer(&self) -> Option<&ProcessTree> {
        self.buffer.as_ref()
    }

    /// Apply one structural edit and return the possibly-new root.
    pub fn apply(&mut self, edit: TreeEdit) -> Result<Option<&ProcessTree>, EditError> {
        let name = edit.name();
        let result = match edit {
            TreeEdit::Insert {
                node_id,
                strategy,
                spec,
            } => self.insert_node(node_id, strategy, spec).map(|_| ()),
            TreeEdit::Delete { node_id } => self.delete_selected(node_id),
            TreeEdit::ShiftLeft { node_id } => self.shift_to_left(node_id).map(|_| ()),
            TreeEdit::ShiftRight { node_id } => self.shift_to_right(node_id).map(|_| ()),
            TreeEdit::ShiftUp { node_id } => self.shift_up(node_id),
            TreeEdit::Freeze { node_id } => self.freeze_subtree(node_id).map(|_| ()),
            TreeEdit::MakeOptional { node_id } => self.make_optional(node_id).map(|_| ()),
            TreeEdit::MakeRepeatable { node_id } => self.make_repeatable(node_id).map(|_| ()),
            TreeEdit::Copy { node_id } => self.copy_subtree(node_id),
            TreeEdit::Cut { node_id } => self.cut_subtree(node_id),
            TreeEdit::Paste { parent_id } => self.paste_subtree(parent_id).map(|_| ()),
        };

        match result {
            Ok(()) => {
                tracing::debug!("{}: applied", name);
                Ok(self.root.as_ref())
            }
            Err(e) => {
                tracing::warn!("{}: rejected: {}", name, e);
                Err(e)
            }
        }
    }

    /// Insert a new node relative to `node_id` under the given strategy.
    /// When the strategy is unavailable at the target, the first available
    /// one is used instead (ABOVE → LEFT → BELOW → CHANGE). Returns the id
    /// of the inserted (or, for CHANGE, modified) node.
    pub fn insert_node(
        &mut self,
        node_id: Option<u64>,
        strategy: InsertStrategy,
        spec: NodeSpec,
    ) -> Result<u64, EditError> {
        if self.root.is_none() {
            // empty tree: the new node becomes the root, any strategy
            let node = self.make_node(&spec);
            let id = node.id;
            self.root = Some(node);
            self.cache();
            return Ok(id);
        }

        let target_id = node_id
            .ok_or_else(|| EditError::InvalidOperation("no node selected".to_string()))?;
        let positions = self.insert_positions(target_id)?;
        let strategy = positions.resolve(strategy);

        let id = match strategy {
            InsertStrategy::Above => self.insert_above(target_id, &spec)?,
            InsertStrategy::Below => self.insert_below(target_id, &spec)?,
            InsertStrategy::Left => self.insert_adjacent(target_id, &spec, 0)?,
            InsertStrategy::Right => self.insert_adjacent(target_id, &spec, 1)?,
            InsertStrategy::Change => self.change_node(target_id, &spec)?,
        };
        self.cache();
        Ok(id)
    }

    fn make_node(&mut self, spec: &NodeSpec) -> ProcessTree {
        match spec {
            NodeSpec::Operator(op) => ProcessTree::new_operator(self.ids.next_id(), *op),
            NodeSpec::Activity(label) => ProcessTree::new_leaf(self.ids.next_id(), label.clone()),
        }
    }

    fn insert_above(&mut self, target_id: u64, spec: &NodeSpec) -> Result<u64, EditError> {
        let NodeSpec::Operator(op) = spec else {
            return Err(EditError::InvalidOperation(
                "only operator nodes can wrap a subtree".to_string(),
            ));
        };
        if self.root.as_ref().map(|r| r.id) != Some(target_id) {
            return Err(EditError::InvalidOperation(
                "only the root can be wrapped from above".to_string(),
            ));
        }

        let wrapper_id = self.ids.next_id();
        if let Some(old_root) = self.root.take() {
            let mut wrapper = ProcessTree::new_operator(wrapper_id, *op);
            wrapper.children.push(old_root);
            self.root = Some(wrapper);
        }
        Ok(wrapper_id)
    }

    fn insert_below(&mut self, target_id: u64, spec: &NodeSpec) -> Result<u64, EditError> {
        let node = self.make_node(spec);
        let id = node.id;

        let root = self.root.as_mut().ok_or(EditError::NodeNotFound(target_id))?;
        let target = root
            .find_mut(target_id)
            .ok_or(EditError::NodeNotFound(target_id))?;
        if target.is_leaf() {
            return Err(EditError::InvalidOperation(
                "cannot insert children below activities".to_string(),
            ));
        }
        if target.operator == Some(Operator::Loop) && target.children.len() >= 2 {
            return Err(EditError::InvalidOperation(
                "loop nodes take at most two children".to_string(),
            ));
        }
        target.children.push(node);
        Ok(id)
    }

    fn insert_adjacent(
        &mut self,
        target_id: u64,
        spec: &NodeSpec,
        offset: usize,
    ) -> Result<u64, EditError> {
        let node = self.make_node(spec);
        let id = node.id;

        let root = self.root.as_mut().ok_or(EditError::NodeNotFound(target_id))?;
        let parent = root.find_parent_mut(target_id).ok_or_else(|| {
            EditError::InvalidOperation("the root has no siblings".to_string())
        })?;
        if parent.operator == Some(Operator::Loop) && parent.children.len() >= 2 {
            return Err(EditError::InvalidOperation(
                "loop nodes take at most two children".to_string(),
            ));
        }
        let idx = parent
            .children
            .iter()
            .position(|c| c.id == target_id)
            .ok_or(EditError::NodeNotFound(target_id))?;
        parent.children.insert(idx + offset, node);
        Ok(id)
    }

    fn change_node(&mut self, target_id: u64, spec: &NodeSpec) -> Result<u64, EditError> {
        let root = self.root.as_mut().ok_or(EditError::NodeNotFound(target_id))?;
        let node = root
            .find_mut(target_id)
            .ok_or(EditError::NodeNotFound(target_id))?;

        match spec {
            NodeSpec::Operator(op) => {
                if *op == Operator::Loop && node.children.len() > 2 {
                    return Err(EditError::InvalidOperation(
                        "loop nodes take at most two children".to_string(),
                    ));
                }
                node.operator = Some(*op);
                node.label = None;
            }
            NodeSpec::Activity(label) => {
                if !node.children.is_empty() {
                    return Err(EditError::InvalidOperation(
                        "cannot change an operator with children into an activity".to_string(),
                    ));
                }
                node.operator = None;
                node.label = Some(label.clone());
            }
        }
        Ok(target_id)
    }

    /// Remove the subtree rooted at `id`. Deleting the root empties the
    /// tree; deleting from an already empty tree is a no-op.
    pub fn delete_selected(&mut self, id: u64) -> Result<(), EditError> {
        let Some(root) = self.root.as_ref() else {
            return Ok(());
        };
        if root.id == id {
            self.root = None;
            self.cache();
            return Ok(());
        }

        let root = self.root.as_mut().ok_or(EditError::NodeNotFound(id))?;
        let parent = root
            .find_parent_mut(id)
            .ok_or(EditError::NodeNotFound(id))?;
        parent.children.retain(|c| c.id != id);
        self.cache();
        Ok(())
    }

    /// Swap the subtree with its left sibling. Returns whether anything
    /// moved; the leftmost position (and the root) is a no-op.
    pub fn shift_to_left(&mut self, id: u64) -> Result<bool, EditError> {
        self.shift_sideways(id, true)
    }

    /// Swap the subtree with its right sibling; no-op at the boundary.
    pub fn shift_to_right(&mut self, id: u64) -> Result<bool, EditError> {
        self.shift_sideways(id, false)
    }

    fn shift_sideways(&mut self, id: u64, left: bool) -> Result<bool, EditError> {
        let root = self.root.as_mut().ok_or(EditError::NodeNotFound(id))?;
        if root.id == id {
            return Ok(false);
        }
        let parent = root
            .find_parent_mut(id)
            .ok_or(EditError::NodeNotFound(id))?;
        let idx = parent
            .children
            .iter()
            .position(|c| c.id == id)
            .ok_or(EditError::NodeNotFound(id))?;

        if left {
            if idx == 0 {
                return Ok(false);
            }
            parent.children.swap(idx - 1, idx);
        } else {
            if idx + 1 == parent.children.len() {
                return Ok(false);
            }
            parent.children.swap(idx, idx + 1);
        }
        self.cache();
        Ok(true)
    }

    /// Remove the subtree from its parent and reinsert it as a sibling
    /// immediately after that parent. Requires a grandparent.
    pub fn shift_up(&mut self, id: u64) -> Result<(), EditError> {
        let root = self.root.as_ref().ok_or(EditError::NodeNotFound(id))?;
        if root.find(id).is_none() {
            return Err(EditError::NodeNotFound(id));
        }
        let parent_id = root
            .find_parent(id)
            .map(|p| p.id)
            .ok_or_else(|| EditError::InvalidOperation("node has no parent".to_string()))?;
        if root.find_parent(parent_id).is_none() {
            return Err(EditError::InvalidOperation(
                "node has no grandparent".to_string(),
            ));
        }

        let root = self.root.as_mut().ok_or(EditError::NodeNotFound(id))?;
        let parent = root
            .find_parent_mut(id)
            .ok_or(EditError::NodeNotFound(id))?;
        let idx = parent
            .children
            .iter()
            .position(|c| c.id == id)
            .ok_or(EditError::NodeNotFound(id))?;
        let node = parent.children.remove(idx);

        let grandparent = root
            .find_parent_mut(parent_id)
            .ok_or(EditError::NodeNotFound(parent_id))?;
        let parent_idx = grandparent
            .children
            .iter()
            .position(|c| c.id == parent_id)
            .ok_or(EditError::NodeNotFound(parent_id))?;
        grandparent.children.insert(parent_idx + 1, node);
        self.cache();
        Ok(())
    }

    /// Toggle the freeze flag on the whole subtree. Returns the new state.
    /// Freezing creates no history entry; freeze state is reconciled onto
    /// restored snapshots by id.
    pub fn freeze_subtree(&mut self, id: u64) -> Result<bool, EditError> {
        let root = self.root.as_mut().ok_or(EditError::NodeNotFound(id))?;
        let node = root.find_mut(id).ok_or(EditError::NodeNotFound(id))?;
        let frozen = !node.frozen;
        node.set_frozen_recursive(frozen);
        Ok(frozen)
    }

    /// Replace the subtree with `choice(tau, node)`. Returns the wrapper id.
    pub fn make_optional(&mut self, id: u64) -> Result<u64, EditError> {
        self.wrap_subtree(id, Operator::Choice, true)
    }

    /// Replace the subtree with `loop(node, tau)`. Returns the wrapper id.
    pub fn make_repeatable(&mut self, id: u64) -> Result<u64, EditError> {
        self.wrap_subtree(id, Operator::Loop, false)
    }

    fn wrap_subtree(&mut self, id: u64, op: Operator, tau_first: bool) -> Result<u64, EditError> {
        if self.root.is_none() {
            return Err(EditError::NodeNotFound(id));
        }
        let wrapper_id = self.ids.next_id();
        let tau = ProcessTree::new_tau(self.ids.next_id());
        let mut wrapper = ProcessTree::new_operator(wrapper_id, op);

        if self.root.as_ref().map(|r| r.id) == Some(id) {
            if let Some(old_root) = self.root.take() {
                wrapper.children = if tau_first {
                    vec![tau, old_root]
                } else {
                    vec![old_root, tau]
                };
                self.root = Some(wrapper);
            }
        } else {
            let root = self.root.as_mut().ok_or(EditError::NodeNotFound(id))?;
            let parent = root
                .find_parent_mut(id)
                .ok_or(EditError::NodeNotFound(id))?;
            let idx = parent
                .children
                .iter()
                .position(|c| c.id == id)
                .ok_or(EditError::NodeNotFound(id))?;
            let node = parent.children.remove(idx);
            wrapper.children = if tau_first {
                vec![tau, node]
            } else {
                vec![node, tau]
            };
            parent.children.insert(idx, wrapper);
        }
        self.cache();
        Ok(wrapper_id)
    }

    /// Store a deep copy of the subtree in the paste buffer. The buffer
    /// survives any number of pastes and edits.
    pub fn copy_subtree(&mut self, id: u64) -> Result<(), EditError> {
        let node = self
            .root
            .as_ref()
            .and_then(|r| r.find(id))
            .ok_or(EditError::NodeNotFound(id))?;
        self.buffer = Some(node.clone());
        Ok(())
    }

    pub fn cut_subtree(&mut self, id: u64) -> Result<(), EditError> {
        self.copy_subtree(id)?;
        self.delete_selected(id)
    }

    /// Append a fresh-id copy of the buffer under `parent_id`; `None`
    /// replaces the whole tree. Pasting under a leaf is rejected. Returns
    /// the id of the pasted subtree's root.
    pub fn paste_subtree(&mut self, parent_id: Option<u64>) -> Result<u64, EditError> {
        let buffer = self
            .buffer
            .clone()
            .ok_or_else(|| EditError::InvalidOperation("paste buffer is empty".to_string()))?;
        let copied = buffer.duplicate(&mut self.ids);
        let id = copied.id;

        match parent_id {
            None => {
                self.root = Some(copied);
            }
            Some(pid) => {
                let root = self.root.as_mut().ok_or(EditError::NodeNotFound(pid))?;
                let parent = root.find_mut(pid).ok_or(EditError::NodeNotFound(pid))?;
                if parent.is_leaf() {
                    return Err(EditError::InvalidOperation(
                        "cannot insert children below activities".to_string(),
                    ));
                }
                if parent.operator == Some(Operator::Loop) && parent.children.len() >= 2 {
                    return Err(EditError::InvalidOperation(
                        "loop nodes take at most two children".to_string(),
                    ));
                }
                parent.children.push(copied);
            }
        }
        self.cache();
        Ok(id)
    }

    /// Step back in the history. Freeze flags of the live tree being
    /// navigated away from are reapplied by id onto the restored copy;
    /// snapshots are taken before freezes, so restoring one must not drop
    /// freeze state set since.
    pub fn undo(&mut self) -> Option<&ProcessTree> {
        let frozen = self.live_frozen_ids();
        let restored = self.history.undo()?;
        self.restore(restored, &frozen)
    }

    /// Step forward in the history, with the same freeze reconciliation.
    pub fn redo(&mut self) -> Option<&ProcessTree> {
        let frozen = self.live_frozen_ids();
        let restored = self.history.redo()?;
        self.restore(restored, &frozen)
    }

    fn live_frozen_ids(&self) -> Vec<u64> {
        self.root
            .as_ref()
            .map(|r| r.frozen_ids())
            .unwrap_or_default()
    }

    fn restore(
        &mut self,
        mut restored: Option<ProcessTree>,
        frozen: &[u64],
    ) -> Option<&ProcessTree> {
        if let Some(tree) = restored.as_mut() {
            tree.apply_frozen(frozen);
        }
        self.root = restored;
        self.root.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn cache(&mut self) {
        self.history.cache(self.root.as_ref());
    }

    /// Serialize the current tree to its JSON shape; the empty tree
    /// serializes as `null`.
    pub fn serialize(&self) -> Result<serde_json::Value, EditError> {
        match &self.root {
            Some(root) => Ok(root.to_json()?),
            None => Ok(serde_json::Value::Null),
        }
    }

    /// Load a tree from its JSON shape, replacing the current one. Fresh
    /// ids are reseeded above the loaded ids.
    pub fn deserialize(&mut self, value: serde_json::Value) -> Result<(), EditError> {
        if value.is_null() {
            self.root = None;
        } else {
            let tree = ProcessTree::from_json(value)?;
            self.ids = IdGenerator::seeded_from(&tree);
            self.root = Some(tree);
        }
        self.cache();
        Ok(())
    }

    // Availability predicates, mirrored by the editor toolbar. The editing
    // operations re-validate all of these.

    pub fn insert_positions(&self, id: u64) -> Result<InsertPositions, EditError> {
        let root = self.root.as_ref().ok_or(EditError::NodeNotFound(id))?;
        InsertPositions::for_node(root, id).ok_or(EditError::NodeNotFound(id))
    }

    pub fn shift_up_disabled(&self, id: u64) -> bool {
        let Some(root) = self.root.as_ref() else {
            return true;
        };
        match root.find_parent(id) {
            Some(parent) => root.find_parent(parent.id).is_none(),
            None => true,
        }
    }

    pub fn shift_left_disabled(&self, id: u64) -> bool {
        let Some(root) = self.root.as_ref() else {
            return true;
        };
        match root.child_index(id) {
            Some(idx) => idx == 0,
            None => true,
        }
    }

    pub fn shift_right_disabled(&self, id: u64) -> bool {
        let Some(root) = self.root.as_ref() else {
            return true;
        };
        match (root.find_parent(id), root.child_index(id)) {
            (Some(parent), Some(idx)) => idx + 1 == parent.children.len(),
            _ => true,
        }
    }

    pub fn freeze_disabled(&self, id: u64) -> bool {
        self.root
            .as_ref()
            .and_then(|r| r.find(id))
            .map(ProcessTree::is_leaf)
            .unwrap_or(true)
    }

    pub fn paste_disabled(&self, parent_id: Option<u64>) -> bool {
        if self.buffer.is_none() {
            return true;
        }
        match parent_id {
            None => self.root.is_some(),
            Some(id) => self
                .root
                .as_ref()
                .and_then(|r| r.find(id))
                .map(ProcessTree::is_leaf)
                .unwrap_or(true),
        }
    }

    // Activity-level helpers over the current tree.

    /// Visible activity names in the current tree.
    pub fn activities(&self) -> BTreeSet<String> {
        self.root.as_ref().map(activity_set).unwrap_or_default()
    }

    /// Rename an activity in every leaf carrying it. Returns the number of
    /// leaves renamed. Renaming is a relabeling, not a structural edit, and
    /// creates no history entry.
    pub fn rename_activity(&mut self, from: &str, to: &str) -> usize {
        self.root
            .as_mut()
            .map(|r| rename_activity(r, from, to))
            .unwrap_or(0)
    }

    /// Syntax report for the current tree; the empty tree is correct.
    pub fn syntax_report(&self) -> SyntaxReport {
        match &self.root {
            Some(root) => check_syntax(root),
            None => SyntaxReport {
                correct: true,
                errors: Vec::new(),
            },
        }
    }

    /// Activities in the tree missing from the canonical activity list.
    pub fn unknown_activities(&self, known: &[String]) -> BTreeSet<String> {
        self.root
            .as_ref()
            .map(|r| unknown_activities(r, known))
            .unwrap_or_default()
    }
}

impl Default for TreeEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_into_empty_tree() {
        let mut editor = TreeEditor::new();

        let id = editor
            .insert_node(
                None,
                InsertStrategy::Above,
                NodeSpec::Activity("a".to_string()),
            )
            .unwrap();

        assert_eq!(editor.root().unwrap().id, id);
        assert_eq!(editor.root().unwrap().label.as_deref(), Some("a"));
    }

    #[test]
    fn test_paste_without_buffer_rejected() {
        let mut editor = TreeEditor::new();
        editor
            .insert_node(
                None,
                InsertStrategy::Above,
                NodeSpec::Operator(Operator::Sequence),
            )
            .unwrap();

        let result = editor.paste_subtree(editor.root().map(|r| r.id));
        assert!(matches!(result, Err(EditError::InvalidOperation(_))));
    }

    #[test]
    fn test_rename_does_not_grow_history() {
        let mut editor = TreeEditor::new();
        editor
            .insert_node(
                None,
                InsertStrategy::Above,
                NodeSpec::Activity("a".to_string()),
            )
            .unwrap();

        assert_eq!(editor.rename_activity("a", "b"), 1);
        assert_eq!(editor.activities().into_iter().collect::<Vec<_>>(), vec!["b"]);

        editor.undo();
        // the rename itself was not a history entry
        assert!(editor.root().is_none());
    }
}
