//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// A structural precondition does not hold (paste under a leaf, shift
    /// without a grandparent, ...). The operation was rejected before any
    /// mutation took place.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Node not found: {0}")]
    NodeNotFound(u64),

    #[error("Model error: {0}")]
    Model(#[from] treelab_model::ModelError),
}
