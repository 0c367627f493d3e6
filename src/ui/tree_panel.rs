//! Concept tree panel
//!
//! Renders one taxonomy from its retained [`TreeViewState`]: expansion and
//! selection are driven from the state, user clicks are recorded as
//! gestures for the synchronizer, and collapse gestures are reported so
//! the application can reconcile the view immediately. Right-clicking a
//! branch requests batch selection of the whole subtree.

use imgui::TreeNodeFlags;

use crate::concept::{ConceptTree, NodeId};
use crate::selection::TreeViewState;

/// What one frame of tree interaction produced
#[derive(Debug, Default)]
pub struct TreePanelOutput {
    pub collapsed: bool,
    pub subtree_request: Option<NodeId>,
}

/// Draws the tree window and applies user gestures to `view`.
pub fn tree_panel(
    ui: &imgui::Ui,
    title: &str,
    tree: &ConceptTree,
    view: &mut TreeViewState,
    position: [f32; 2],
    size: [f32; 2],
) -> TreePanelOutput {
    let mut output = TreePanelOutput::default();
    let scroll_to = view.take_scroll();

    ui.window(title)
        .position(position, imgui::Condition::FirstUseEver)
        .size(size, imgui::Condition::FirstUseEver)
        .build(|| {
            render_node(ui, tree, view, tree.root(), scroll_to, &mut output);
        });

    output
}

fn render_node(
    ui: &imgui::Ui,
    tree: &ConceptTree,
    view: &mut TreeViewState,
    node: NodeId,
    scroll_to: Option<NodeId>,
    output: &mut TreePanelOutput,
) {
    let concept = tree.node(node);
    let is_leaf = concept.is_leaf();
    let _id = ui.push_id_usize(node.0);

    let mut flags = TreeNodeFlags::OPEN_ON_ARROW | TreeNodeFlags::SPAN_AVAIL_WIDTH;
    if is_leaf {
        flags |= TreeNodeFlags::LEAF;
    }
    if view.is_selected(node) {
        flags |= TreeNodeFlags::SELECTED;
    }

    let open = ui
        .tree_node_config(concept.name.as_str())
        .flags(flags)
        .opened(view.is_expanded(node), imgui::Condition::Always)
        .push();

    if scroll_to == Some(node) {
        ui.set_scroll_here_y_with_ratio(0.5);
    }

    if ui.is_item_toggled_open() {
        if view.is_expanded(node) {
            view.collapse(node, tree);
            output.collapsed = true;
        } else {
            view.expand(node);
        }
    } else if ui.is_item_clicked() {
        view.click(node, ui.io().key_ctrl);
    }

    if !is_leaf && ui.is_item_clicked_with_button(imgui::MouseButton::Right) {
        output.subtree_request = Some(node);
    }

    if let Some(_token) = open {
        for &child in &concept.children {
            render_node(ui, tree, view, child, scroll_to, output);
        }
    }
}
