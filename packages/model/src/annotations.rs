//! Conformance and performance annotations.
//!
//! Annotations are computed by external collaborators (a conformance or
//! performance backend) and attached to existing nodes by id, after the
//! fact. They never alter tree topology and are excluded from structural
//! equality; see [`ProcessTree::structural_eq`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::process_tree::ProcessTree;

/// A conformance value together with the weight it was aggregated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedValue {
    pub value: f64,
    pub weight: f64,
}

/// Subtree conformance, weighted equally across variants and optionally by
/// variant counts in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConformance {
    pub weighted_equally: WeightedValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_by_counts: Option<WeightedValue>,
}

/// Aggregated statistics for one performance indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdev: Option<f64>,
}

/// Map from performance indicator (`service_time`, `waiting_time`, ...) to
/// its aggregated statistics.
pub type TreePerformance = HashMap<String, PerformanceStats>;

impl ProcessTree {
    /// Attach a conformance annotation to the node with the given id.
    /// Returns false when the id does not exist in this tree.
    pub fn attach_conformance(&mut self, id: u64, conformance: TreeConformance) -> bool {
        match self.find_mut(id) {
            Some(node) => {
                node.conformance = Some(conformance);
                true
            }
            None => false,
        }
    }

    /// Attach a performance annotation to the node with the given id.
    pub fn attach_performance(&mut self, id: u64, performance: TreePerformance) -> bool {
        match self.find_mut(id) {
            Some(node) => {
                node.performance = Some(performance);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_tree::Operator;

    fn conformance(value: f64) -> TreeConformance {
        TreeConformance {
            weighted_equally: WeightedValue { value, weight: 1.0 },
            weighted_by_counts: None,
        }
    }

    #[test]
    fn test_attach_by_id() {
        let mut root = ProcessTree::new_operator(1, Operator::Sequence);
        root.children.push(ProcessTree::new_leaf(2, "a"));

        assert!(root.attach_conformance(2, conformance(0.75)));
        assert_eq!(
            root.find(2).unwrap().conformance.as_ref().unwrap().weighted_equally.value,
            0.75
        );
    }

    #[test]
    fn test_attach_to_missing_id_reports_failure() {
        let mut root = ProcessTree::new_operator(1, Operator::Sequence);
        root.children.push(ProcessTree::new_leaf(2, "a"));

        assert!(!root.attach_conformance(99, conformance(0.5)));
        assert!(root.find(2).unwrap().conformance.is_none());
    }

    #[test]
    fn test_performance_round_trips_with_tree() {
        let mut root = ProcessTree::new_operator(1, Operator::Sequence);
        root.children.push(ProcessTree::new_leaf(2, "a"));

        let mut perf = TreePerformance::new();
        perf.insert(
            "service_time".to_string(),
            PerformanceStats {
                min: 1.0,
                max: 9.0,
                mean: 4.2,
                stdev: Some(1.1),
            },
        );
        assert!(root.attach_performance(2, perf));

        let json = root.to_json().unwrap();
        let restored = ProcessTree::from_json(json).unwrap();
        assert_eq!(root, restored);
    }
}
