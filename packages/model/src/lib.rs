//! # Treelab Model
//!
//! Data model for the two recursive tree types edited by Treelab:
//!
//! - [`ProcessTree`]: a process model: operator nodes (sequence, parallel,
//!   choice, loop) over activity leaves, with per-node freeze flags and
//!   post-hoc conformance/performance annotations.
//! - [`VariantElement`]: a trace pattern: nested sequence/parallel/choice/
//!   fallthrough groupings of activities.
//!
//! The model layer owns everything intrinsic to the trees themselves:
//! construction, deep copies, structural equality, JSON round trips, whole
//! tree transforms and validity checks. All structural *mutation* lives in
//! the `treelab-editor` crate; annotation collaborators only ever attach
//! values to existing node ids through [`annotations`].

pub mod annotations;
pub mod error;
pub mod id_generator;
pub mod integrity;
pub mod process_tree;
pub mod transform;
pub mod variant_element;
pub mod visitor;

pub use annotations::{PerformanceStats, TreeConformance, TreePerformance, WeightedValue};
pub use error::ModelError;
pub use id_generator::IdGenerator;
pub use process_tree::{Operator, ProcessTree, TAU};
pub use variant_element::{InfixType, VariantElement};
