//! # Treelab Editor
//!
//! Structural editing engine for process trees and variant patterns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: tree types + serialization           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: structural mutation + history       │
//! │  - TreeEditor: insert/delete/shift/wrap,    │
//! │    freeze, copy/paste, undo/redo            │
//! │  - PatternEditor: six insertion strategies, │
//! │    delete with consolidation, local history │
//! │  - History: bounded snapshot store          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **No partial states**: an edit either completes all of its splices
//!    and collapses or is rejected before any mutation begins.
//! 2. **Defensive validation**: preconditions are re-checked inside every
//!    operation even when the caller consulted the `*_disabled` predicates.
//! 3. **Single writer**: the editors assume strictly sequential operations
//!    on one live tree; the embedding application serializes callers.
//! 4. **Snapshots are deep copies**: undo/redo restores independent copies,
//!    with freeze state reconciled by node id across snapshots.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use treelab_editor::{InsertStrategy, NodeSpec, TreeEdit, TreeEditor};
//! use treelab_model::Operator;
//!
//! let mut editor = TreeEditor::new();
//! editor.apply(TreeEdit::Insert {
//!     node_id: None,
//!     strategy: InsertStrategy::Above,
//!     spec: NodeSpec::Operator(Operator::Sequence),
//! })?;
//! editor.undo();
//! ```

mod editor;
mod edits;
mod errors;
mod history;
mod pattern;

pub use editor::TreeEditor;
pub use edits::{InsertPositions, InsertStrategy, NodeSpec, TreeEdit};
pub use errors::EditError;
pub use history::{History, Snapshot, DEFAULT_CAPACITY};
pub use pattern::{InsertionStrategy, PatternEditor, PATTERN_HISTORY_CAPACITY};

// Re-export common model types for convenience
pub use treelab_model::{Operator, ProcessTree, VariantElement, TAU};
