//! # UI Layer
//!
//! ImGui panels and the platform/renderer glue. Panels read and mutate the
//! retained view models (`TreeViewState`, list model, log buffer); heavier
//! consequences are reported back to the application as [`UiAction`]s so
//! they can be routed through the command manager.

pub mod log_panel;
pub mod manager;
pub mod selection_panel;
pub mod tree_panel;

pub use manager::UiManager;
pub use tree_panel::TreePanelOutput;

use crate::concept::NodeId;

/// Panel interactions the application must act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Context-menu batch selection of a whole subtree
    SelectSubtree { view: usize, node: NodeId },
    /// Clear-everything button
    ClearSelection,
    Undo,
    Redo,
    ResetView,
    ToggleTurntable,
    /// A branch was collapsed in the given view; reconcile it
    Collapsed { view: usize },
    /// Choose the mesh folder for the next session
    PickMeshFolder,
}
