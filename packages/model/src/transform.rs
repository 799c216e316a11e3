//! Whole-tree transforms over activity labels.

use std::collections::BTreeSet;

use crate::process_tree::ProcessTree;
use crate::visitor::{walk_node, walk_node_mut, Visitor, VisitorMut};

/// Rewrite every leaf labeled `from` to `to`. Returns the number of leaves
/// that were renamed.
pub fn rename_activity(root: &mut ProcessTree, from: &str, to: &str) -> usize {
    struct LeafRenamer<'a> {
        from: &'a str,
        to: &'a str,
        renamed: usize,
    }

    impl VisitorMut for LeafRenamer<'_> {
        fn visit_node_mut(&mut self, node: &mut ProcessTree) {
            if node.is_leaf() && node.label.as_deref() == Some(self.from) {
                node.label = Some(self.to.to_string());
                self.renamed += 1;
            }
            walk_node_mut(self, node);
        }
    }

    let mut renamer = LeafRenamer {
        from,
        to,
        renamed: 0,
    };
    renamer.visit_node_mut(root);
    renamer.renamed
}

/// The set of visible activity names in the tree. Tau leaves are excluded.
pub fn activity_set(root: &ProcessTree) -> BTreeSet<String> {
    struct ActivityCollector {
        activities: BTreeSet<String>,
    }

    impl Visitor for ActivityCollector {
        fn visit_node(&mut self, node: &ProcessTree) {
            if let Some(label) = &node.label {
                if !node.is_tau() {
                    self.activities.insert(label.clone());
                }
            }
            walk_node(self, node);
        }
    }

    let mut collector = ActivityCollector {
        activities: BTreeSet::new(),
    };
    collector.visit_node(root);
    collector.activities
}
