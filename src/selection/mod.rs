//! # Selection Core
//!
//! The canonical mesh selection and the machinery that keeps every view in
//! agreement with it: an observable ordered set of mesh handles, a retained
//! widget model per tree panel, a per-view binding with ghost/missing
//! reconciliation, and the synchronizer that routes batched deltas between
//! all of them without feedback loops.

pub mod binding;
pub mod delta;
pub mod list;
pub mod set;
pub mod sync;
pub mod tree_state;

pub use binding::TreeViewBinding;
pub use delta::Delta;
pub use list::{LabelEntry, SelectionListModel};
pub use set::MeshSelectionSet;
pub use sync::{FocusTarget, SelectionSynchronizer, SyncOutcome};
pub use tree_state::TreeViewState;
