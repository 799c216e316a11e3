//! Error types for the tree model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A serialized tree could not be decoded: unknown `type`/`operator`
    /// value, missing field, or a node violating leaf/operator exclusivity.
    #[error("Malformed tree: {0}")]
    MalformedTree(String),
}
