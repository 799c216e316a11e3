use serde::{Deserialize, Serialize};

use crate::annotations::{TreeConformance, TreePerformance};
use crate::error::ModelError;
use crate::id_generator::IdGenerator;
use crate::visitor::{walk_node, Visitor};

/// Reserved label for the invisible (silent) activity.
pub const TAU: &str = "tau";

/// Operator kinds of internal process tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Sequence,
    Parallel,
    Choice,
    Loop,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Sequence => "sequence",
            Operator::Parallel => "parallel",
            Operator::Choice => "choice",
            Operator::Loop => "loop",
        }
    }
}

/// A node of a process model tree.
///
/// Exactly one of `operator` / `label` is set: operator nodes own an ordered
/// list of children, leaves carry an activity name (or [`TAU`]). The parent
/// relation is not stored; the owning direction is strictly parent to
/// children, and [`ProcessTree::find_parent`] recovers the reverse relation
/// by id lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTree {
    pub id: u64,
    pub operator: Option<Operator>,
    pub label: Option<String>,
    #[serde(default)]
    pub children: Vec<ProcessTree>,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<TreePerformance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conformance: Option<TreeConformance>,
}

impl ProcessTree {
    pub fn new_operator(id: u64, operator: Operator) -> Self {
        Self {
            id,
            operator: Some(operator),
            label: None,
            children: Vec::new(),
            frozen: false,
            performance: None,
            conformance: None,
        }
    }

    pub fn new_leaf(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            operator: None,
            label: Some(label.into()),
            children: Vec::new(),
            frozen: false,
            performance: None,
            conformance: None,
        }
    }

    pub fn new_tau(id: u64) -> Self {
        Self::new_leaf(id, TAU)
    }

    pub fn is_leaf(&self) -> bool {
        self.operator.is_none()
    }

    pub fn is_operator(&self) -> bool {
        self.operator.is_some()
    }

    pub fn is_tau(&self) -> bool {
        self.label.as_deref() == Some(TAU)
    }

    /// Find the node with the given id in this subtree.
    pub fn find(&self, id: u64) -> Option<&ProcessTree> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: u64) -> Option<&mut ProcessTree> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    pub fn contains(&self, id: u64) -> bool {
        self.find(id).is_some()
    }

    /// Find the parent of the node with the given id. `None` for the root
    /// itself and for unknown ids.
    pub fn find_parent(&self, id: u64) -> Option<&ProcessTree> {
        if self.children.iter().any(|c| c.id == id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_parent(id))
    }

    pub fn find_parent_mut(&mut self, id: u64) -> Option<&mut ProcessTree> {
        if self.children.iter().any(|c| c.id == id) {
            return Some(self);
        }
        for child in &mut self.children {
            if let Some(parent) = child.find_parent_mut(id) {
                return Some(parent);
            }
        }
        None
    }

    /// Index of the node in its parent's child list.
    pub fn child_index(&self, id: u64) -> Option<usize> {
        self.find_parent(id)
            .and_then(|p| p.children.iter().position(|c| c.id == id))
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ProcessTree::node_count).sum::<usize>()
    }

    pub fn max_id(&self) -> u64 {
        self.children
            .iter()
            .map(ProcessTree::max_id)
            .fold(self.id, u64::max)
    }

    /// Deep copy with freshly generated ids, used when pasting a buffered
    /// subtree so ids stay unique within the receiving tree. Frozen flags
    /// are kept, annotations are dropped (they are keyed to the old ids).
    pub fn duplicate(&self, ids: &mut IdGenerator) -> ProcessTree {
        ProcessTree {
            id: ids.next_id(),
            operator: self.operator,
            label: self.label.clone(),
            children: self.children.iter().map(|c| c.duplicate(ids)).collect(),
            frozen: self.frozen,
            performance: None,
            conformance: None,
        }
    }

    /// Structural equality: ids, operators/labels and child order.
    ///
    /// Frozen flags and annotations are excluded: toggling a freeze or
    /// attaching an annotation does not make a tree a new history entry.
    pub fn structural_eq(&self, other: &ProcessTree) -> bool {
        self.id == other.id
            && self.operator == other.operator
            && self.label == other.label
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.structural_eq(b))
    }

    /// Set the frozen flag on this node and its whole subtree.
    pub fn set_frozen_recursive(&mut self, frozen: bool) {
        self.frozen = frozen;
        for child in &mut self.children {
            child.set_frozen_recursive(frozen);
        }
    }

    /// Ids of all frozen nodes in this subtree.
    pub fn frozen_ids(&self) -> Vec<u64> {
        struct FrozenCollector {
            ids: Vec<u64>,
        }

        impl Visitor for FrozenCollector {
            fn visit_node(&mut self, node: &ProcessTree) {
                if node.frozen {
                    self.ids.push(node.id);
                }
                walk_node(self, node);
            }
        }

        let mut collector = FrozenCollector { ids: Vec::new() };
        collector.visit_node(self);
        collector.ids
    }

    /// Re-mark the listed ids as frozen, e.g. after restoring a history
    /// snapshot that predates the freeze. Unknown ids are skipped; the
    /// node no longer exists in this version of the tree.
    pub fn apply_frozen(&mut self, ids: &[u64]) {
        if ids.contains(&self.id) {
            self.frozen = true;
        }
        for child in &mut self.children {
            child.apply_frozen(ids);
        }
    }

    /// Serialize to the documented JSON shape:
    /// `{ id, operator, label, children, frozen, performance?, conformance? }`.
    pub fn to_json(&self) -> Result<serde_json::Value, ModelError> {
        serde_json::to_value(self).map_err(|e| ModelError::MalformedTree(e.to_string()))
    }

    /// Decode a tree from its JSON shape. Unknown operator values, missing
    /// fields and leaf/operator exclusivity violations all reject the whole
    /// tree; the caller decides whether to abort loading.
    pub fn from_json(value: serde_json::Value) -> Result<ProcessTree, ModelError> {
        let tree: ProcessTree =
            serde_json::from_value(value).map_err(|e| ModelError::MalformedTree(e.to_string()))?;
        tree.validate_shape()?;
        Ok(tree)
    }

    fn validate_shape(&self) -> Result<(), ModelError> {
        match (self.operator, &self.label) {
            (Some(_), Some(label)) => {
                return Err(ModelError::MalformedTree(format!(
                    "node {} has both an operator and label '{}'",
                    self.id, label
                )));
            }
            (None, None) => {
                return Err(ModelError::MalformedTree(format!(
                    "node {} has neither operator nor label",
                    self.id
                )));
            }
            (None, Some(_)) if !self.children.is_empty() => {
                return Err(ModelError::MalformedTree(format!(
                    "leaf {} has children",
                    self.id
                )));
            }
            _ => {}
        }
        for child in &self.children {
            child.validate_shape()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ProcessTree {
        let mut root = ProcessTree::new_operator(1, Operator::Sequence);
        let mut par = ProcessTree::new_operator(2, Operator::Parallel);
        par.children.push(ProcessTree::new_leaf(3, "a"));
        par.children.push(ProcessTree::new_leaf(4, "b"));
        root.children.push(par);
        root.children.push(ProcessTree::new_leaf(5, "c"));
        root
    }

    #[test]
    fn test_find_and_find_parent() {
        let tree = sample_tree();

        assert_eq!(tree.find(4).unwrap().label.as_deref(), Some("b"));
        assert_eq!(tree.find_parent(4).unwrap().id, 2);
        assert_eq!(tree.find_parent(2).unwrap().id, 1);
        assert!(tree.find_parent(1).is_none());
        assert!(tree.find(99).is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let mut tree = sample_tree();
        tree.find_mut(2).unwrap().set_frozen_recursive(true);

        let json = tree.to_json().unwrap();
        let restored = ProcessTree::from_json(json).unwrap();

        assert_eq!(tree, restored);
        assert!(restored.find(3).unwrap().frozen);
    }

    #[test]
    fn test_unknown_operator_is_malformed() {
        let json = serde_json::json!({
            "id": 1,
            "operator": "xor-loop",
            "label": null,
            "children": [],
        });

        assert!(matches!(
            ProcessTree::from_json(json),
            Err(ModelError::MalformedTree(_))
        ));
    }

    #[test]
    fn test_leaf_with_children_is_malformed() {
        let json = serde_json::json!({
            "id": 1,
            "operator": null,
            "label": "a",
            "children": [
                { "id": 2, "operator": null, "label": "b", "children": [] }
            ],
        });

        assert!(matches!(
            ProcessTree::from_json(json),
            Err(ModelError::MalformedTree(_))
        ));
    }

    #[test]
    fn test_duplicate_regenerates_ids() {
        let tree = sample_tree();
        let mut ids = IdGenerator::seeded_from(&tree);

        let copy = tree.duplicate(&mut ids);

        assert!(copy.id > 5);
        assert_eq!(copy.node_count(), tree.node_count());
        // no id of the copy collides with the original
        let mut stack = vec![&copy];
        while let Some(node) = stack.pop() {
            assert!(!tree.contains(node.id));
            stack.extend(node.children.iter());
        }
    }

    #[test]
    fn test_structural_eq_ignores_frozen_and_annotations() {
        let tree = sample_tree();
        let mut other = tree.clone();
        other.find_mut(2).unwrap().set_frozen_recursive(true);

        assert!(tree.structural_eq(&other));
        assert_ne!(tree, other);
    }

    #[test]
    fn test_frozen_ids_and_reapply() {
        let mut tree = sample_tree();
        tree.find_mut(2).unwrap().set_frozen_recursive(true);

        let ids = tree.frozen_ids();
        assert_eq!(ids, vec![2, 3, 4]);

        let mut fresh = sample_tree();
        fresh.apply_frozen(&ids);
        assert!(fresh.find(2).unwrap().frozen);
        assert!(fresh.find(4).unwrap().frozen);
        assert!(!fresh.find(5).unwrap().frozen);
    }
}
