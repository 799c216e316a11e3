//! # Structural Edits
//!
//! The operation vocabulary of the process tree editor.
//!
//! ## Semantics
//!
//! - Every edit transitions the tree between two valid states; an edit
//!   either completes all required splices or is rejected before any
//!   mutation begins.
//! - Preconditions are re-validated inside the editor even when the caller
//!   already consulted the `*_disabled` predicates.
//! - Insertion strategies that are structurally unavailable at the target
//!   fall back to the first available one, in the fixed order
//!   ABOVE → LEFT → BELOW → CHANGE.

use serde::{Deserialize, Serialize};

use treelab_model::{Operator, ProcessTree};

/// Where a new node is placed relative to the selected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertStrategy {
    /// Wrap the root in a new operator node, which becomes the new root.
    Above,
    /// Append a new child to the selected operator node.
    Below,
    /// Insert a sibling immediately left of the selection.
    Left,
    /// Insert a sibling immediately right of the selection.
    Right,
    /// Replace the selection's own operator/label, keeping its position.
    Change,
}

/// What a new node is: an operator or a labeled activity leaf. Tau leaves
/// are activities labeled [`treelab_model::TAU`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeSpec {
    Operator(Operator),
    Activity(String),
}

/// Insert positions structurally available around one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPositions {
    pub above: bool,
    pub below: bool,
    pub left_right: bool,
}

impl InsertPositions {
    /// Compute availability for the node with `id` inside `root`: ABOVE is
    /// available only on the root (growing the tree upward), LEFT/RIGHT
    /// only beside non-root nodes, BELOW only on operator nodes. Children
    /// of a two-child loop accept no LEFT/RIGHT and a two-child loop itself
    /// accepts no BELOW.
    pub fn for_node(root: &ProcessTree, id: u64) -> Option<InsertPositions> {
        let node = root.find(id)?;
        let parent = root.find_parent(id);

        let mut positions = InsertPositions {
            above: parent.is_none(),
            below: node.is_operator(),
            left_right: parent.is_some(),
        };

        if let Some(parent) = parent {
            if parent.operator == Some(Operator::Loop) && parent.children.len() == 2 {
                positions.left_right = false;
            }
        }
        if node.operator == Some(Operator::Loop) && node.children.len() == 2 {
            positions.below = false;
        }

        Some(positions)
    }

    pub fn allows(&self, strategy: InsertStrategy) -> bool {
        match strategy {
            InsertStrategy::Above => self.above,
            InsertStrategy::Below => self.below,
            InsertStrategy::Left | InsertStrategy::Right => self.left_right,
            InsertStrategy::Change => true,
        }
    }

    /// First available strategy in the fixed fallback order.
    pub fn first_available(&self) -> InsertStrategy {
        if self.above {
            InsertStrategy::Above
        } else if self.left_right {
            InsertStrategy::Left
        } else if self.below {
            InsertStrategy::Below
        } else {
            InsertStrategy::Change
        }
    }

    /// The requested strategy when it is available, the fallback otherwise.
    pub fn resolve(&self, requested: InsertStrategy) -> InsertStrategy {
        if self.allows(requested) {
            requested
        } else {
            self.first_available()
        }
    }
}

/// One structural edit, applied through [`crate::TreeEditor::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeEdit {
    /// Insert a new node relative to `node_id`. `node_id` is `None` only
    /// for the empty tree, where the new node becomes the root.
    Insert {
        node_id: Option<u64>,
        strategy: InsertStrategy,
        spec: NodeSpec,
    },

    /// Remove the subtree. Deleting the root empties the tree.
    Delete { node_id: u64 },

    /// Swap the subtree with its left/right sibling; no-op at the boundary.
    ShiftLeft { node_id: u64 },
    ShiftRight { node_id: u64 },

    /// Reinsert the subtree as a sibling immediately after its former
    /// parent. Requires a grandparent.
    ShiftUp { node_id: u64 },

    /// Toggle the freeze flag on the whole subtree.
    Freeze { node_id: u64 },

    /// Wrap the subtree in `choice(tau, node)`.
    MakeOptional { node_id: u64 },

    /// Wrap the subtree in `loop(node, tau)`.
    MakeRepeatable { node_id: u64 },

    /// Store a deep copy of the subtree in the paste buffer.
    Copy { node_id: u64 },

    /// Copy to the buffer, then delete.
    Cut { node_id: u64 },

    /// Append a fresh-id copy of the buffer under `parent_id`; `None`
    /// replaces the whole tree with the buffer contents.
    Paste { parent_id: Option<u64> },
}

impl TreeEdit {
    /// Short name for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            TreeEdit::Insert { .. } => "insert",
            TreeEdit::Delete { .. } => "delete",
            TreeEdit::ShiftLeft { .. } => "shift-left",
            TreeEdit::ShiftRight { .. } => "shift-right",
            TreeEdit::ShiftUp { .. } => "shift-up",
            TreeEdit::Freeze { .. } => "freeze",
            TreeEdit::MakeOptional { .. } => "make-optional",
            TreeEdit::MakeRepeatable { .. } => "make-repeatable",
            TreeEdit::Copy { .. } => "copy",
            TreeEdit::Cut { .. } => "cut",
            TreeEdit::Paste { .. } => "paste",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loop_tree() -> ProcessTree {
        let mut root = ProcessTree::new_operator(1, Operator::Sequence);
        let mut lp = ProcessTree::new_operator(2, Operator::Loop);
        lp.children.push(ProcessTree::new_leaf(3, "a"));
        lp.children.push(ProcessTree::new_tau(4));
        root.children.push(lp);
        root.children.push(ProcessTree::new_leaf(5, "b"));
        root
    }

    #[test]
    fn test_root_positions() {
        let tree = loop_tree();
        let positions = InsertPositions::for_node(&tree, 1).unwrap();

        assert!(positions.above);
        assert!(!positions.left_right);
        assert!(positions.below);
        assert_eq!(positions.first_available(), InsertStrategy::Above);
    }

    #[test]
    fn test_leaf_positions() {
        let tree = loop_tree();
        let positions = InsertPositions::for_node(&tree, 5).unwrap();

        assert!(!positions.above);
        assert!(positions.left_right);
        assert!(!positions.below);
        assert_eq!(positions.first_available(), InsertStrategy::Left);
    }

    #[test]
    fn test_full_loop_disables_below_and_child_siblings() {
        let tree = loop_tree();

        let on_loop = InsertPositions::for_node(&tree, 2).unwrap();
        assert!(!on_loop.below);
        assert!(on_loop.left_right);

        // children of a two-child loop accept neither siblings nor a wrap
        let on_loop_child = InsertPositions::for_node(&tree, 3).unwrap();
        assert!(!on_loop_child.left_right);
        assert!(!on_loop_child.above);
        assert_eq!(on_loop_child.first_available(), InsertStrategy::Change);
    }

    #[test]
    fn test_fallback_order() {
        let all = InsertPositions {
            above: true,
            below: true,
            left_right: true,
        };
        assert_eq!(all.resolve(InsertStrategy::Right), InsertStrategy::Right);

        let no_above = InsertPositions {
            above: false,
            below: true,
            left_right: true,
        };
        assert_eq!(no_above.resolve(InsertStrategy::Above), InsertStrategy::Left);

        let below_only = InsertPositions {
            above: false,
            below: true,
            left_right: false,
        };
        assert_eq!(below_only.resolve(InsertStrategy::Left), InsertStrategy::Below);

        let none = InsertPositions {
            above: false,
            below: false,
            left_right: false,
        };
        assert_eq!(none.resolve(InsertStrategy::Above), InsertStrategy::Change);
    }
}
