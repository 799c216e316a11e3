//! Structural validity checks for loaded and edited trees.

use std::collections::BTreeSet;

use crate::process_tree::{Operator, ProcessTree};
use crate::transform::activity_set;

/// Outcome of a syntax check over a whole tree.
///
/// A tree with incorrect syntax can still be displayed and edited further;
/// the report is surfaced to the user, not enforced by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxReport {
    pub correct: bool,
    pub errors: Vec<String>,
}

/// Check the tree against the process tree syntax rules: leaf/operator
/// exclusivity, loop arity of at most two, no empty operator nodes, and
/// unique node ids.
pub fn check_syntax(root: &ProcessTree) -> SyntaxReport {
    let mut errors = Vec::new();
    let mut seen_ids = BTreeSet::new();
    check_node(root, &mut seen_ids, &mut errors);
    SyntaxReport {
        correct: errors.is_empty(),
        errors,
    }
}

fn check_node(node: &ProcessTree, seen_ids: &mut BTreeSet<u64>, errors: &mut Vec<String>) {
    if !seen_ids.insert(node.id) {
        errors.push(format!("duplicate node id {}", node.id));
    }

    match (node.operator, &node.label) {
        (Some(op), None) => {
            if node.children.is_empty() {
                errors.push(format!("{} node {} has no children", op.as_str(), node.id));
            }
            if op == Operator::Loop && node.children.len() > 2 {
                errors.push(format!(
                    "loop node {} has {} children, at most 2 allowed",
                    node.id,
                    node.children.len()
                ));
            }
        }
        (None, Some(_)) => {
            if !node.children.is_empty() {
                errors.push(format!("activity node {} has children", node.id));
            }
        }
        (Some(_), Some(_)) => {
            errors.push(format!("node {} has both operator and label", node.id));
        }
        (None, None) => {
            errors.push(format!("node {} has neither operator nor label", node.id));
        }
    }

    for child in &node.children {
        check_node(child, seen_ids, errors);
    }
}

/// Activities appearing in the tree but missing from the canonical activity
/// list, e.g. after importing a model discovered on a different event log.
/// Used for validation messages only; loading proceeds regardless.
pub fn unknown_activities(root: &ProcessTree, known: &[String]) -> BTreeSet<String> {
    activity_set(root)
        .into_iter()
        .filter(|a| !known.iter().any(|k| k == a))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tree_passes() {
        let mut root = ProcessTree::new_operator(1, Operator::Loop);
        root.children.push(ProcessTree::new_leaf(2, "a"));
        root.children.push(ProcessTree::new_tau(3));

        let report = check_syntax(&root);
        assert!(report.correct, "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn test_loop_arity_violation() {
        let mut root = ProcessTree::new_operator(1, Operator::Loop);
        root.children.push(ProcessTree::new_leaf(2, "a"));
        root.children.push(ProcessTree::new_leaf(3, "b"));
        root.children.push(ProcessTree::new_leaf(4, "c"));

        let report = check_syntax(&root);
        assert!(!report.correct);
        assert!(report.errors[0].contains("loop"));
    }

    #[test]
    fn test_empty_operator_flagged() {
        let root = ProcessTree::new_operator(1, Operator::Sequence);

        let report = check_syntax(&root);
        assert!(!report.correct);
    }

    #[test]
    fn test_duplicate_ids_flagged() {
        let mut root = ProcessTree::new_operator(1, Operator::Sequence);
        root.children.push(ProcessTree::new_leaf(1, "a"));

        let report = check_syntax(&root);
        assert!(report.errors.iter().any(|e| e.contains("duplicate")));
    }

    #[test]
    fn test_unknown_activities() {
        let mut root = ProcessTree::new_operator(1, Operator::Sequence);
        root.children.push(ProcessTree::new_leaf(2, "a"));
        root.children.push(ProcessTree::new_leaf(3, "mystery"));

        let known = vec!["a".to_string(), "b".to_string()];
        let unknown = unknown_activities(&root, &known);

        assert_eq!(
            unknown.into_iter().collect::<Vec<_>>(),
            vec!["mystery".to_string()]
        );
    }
}
