//! Retained tree-widget state
//!
//! The tree panels render in immediate mode, so the widget-level state a
//! retained toolkit would keep for us lives here: the ordered selection,
//! the expansion set, and a queue of user gestures awaiting the binding
//! layer. Two mutation paths exist and must not be mixed up:
//!
//! - the *user* path (`click`) records one [`Delta`] per gesture for the
//!   synchronizer to translate into canonical mutations;
//! - the *programmatic* path (`select_silent` / `deselect_silent`) is used
//!   by the binding while syncing and records nothing.
//!
//! Collapsing a branch drops the widget selection of hidden descendants
//! without recording a gesture. That models the auto-deselect side effect
//! of the widget layer; the binding's reconciliation pass restores those
//! selections from its own tracker.

use std::collections::HashSet;

use crate::concept::{ConceptTree, NodeId};

use super::delta::Delta;

/// Selection and expansion state of one tree panel
#[derive(Default)]
pub struct TreeViewState {
    selected: Vec<NodeId>,
    selected_set: HashSet<NodeId>,
    expanded: HashSet<NodeId>,
    pending: Vec<Delta<NodeId>>,
    scroll_to: Option<NodeId>,
}

impl TreeViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// User click on a node. Additive (ctrl-click) toggles the node;
    /// plain click replaces the selection. Exactly one gesture delta is
    /// recorded either way.
    pub fn click(&mut self, node: NodeId, additive: bool) {
        let mut delta = Delta::new();
        if additive {
            if self.selected_set.contains(&node) {
                self.remove(node);
                delta.removed.push(node);
            } else {
                self.add(node);
                delta.added.push(node);
            }
        } else {
            let was_selected = self.selected_set.contains(&node);
            for prev in std::mem::take(&mut self.selected) {
                if prev != node {
                    delta.removed.push(prev);
                }
            }
            self.selected_set.clear();
            self.add(node);
            if !was_selected {
                delta.added.push(node);
            }
        }
        if !delta.is_empty() {
            self.pending.push(delta);
        }
    }

    /// Gestures recorded since the last drain
    pub fn take_pending(&mut self) -> Vec<Delta<NodeId>> {
        std::mem::take(&mut self.pending)
    }

    // Programmatic path: widget mutation without gesture recording.

    pub fn select_silent(&mut self, node: NodeId) -> bool {
        if self.selected_set.contains(&node) {
            return false;
        }
        self.add(node);
        true
    }

    pub fn deselect_silent(&mut self, node: NodeId) -> bool {
        if !self.selected_set.contains(&node) {
            return false;
        }
        self.remove(node);
        true
    }

    pub fn clear_silent(&mut self) {
        self.selected.clear();
        self.selected_set.clear();
    }

    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    pub fn is_selected(&self, node: NodeId) -> bool {
        self.selected_set.contains(&node)
    }

    // Expansion.

    pub fn is_expanded(&self, node: NodeId) -> bool {
        self.expanded.contains(&node)
    }

    pub fn expand(&mut self, node: NodeId) {
        self.expanded.insert(node);
    }

    /// Collapses a branch. The widget loses the selection of every hidden
    /// descendant silently; no gesture is recorded for the loss.
    pub fn collapse(&mut self, node: NodeId, tree: &ConceptTree) {
        self.expanded.remove(&node);
        let mut hidden = Vec::new();
        tree.visit_preorder(node, &mut |id, _| {
            if id != node && self.selected_set.contains(&id) {
                hidden.push(id);
            }
        });
        for id in hidden {
            self.remove(id);
        }
    }

    /// Expands every ancestor so `node` is visible.
    pub fn reveal(&mut self, tree: &ConceptTree, node: NodeId) {
        if let Some(path) = tree.path_to(node) {
            for ancestor in path.iter().take(path.len().saturating_sub(1)) {
                self.expanded.insert(*ancestor);
            }
        }
    }

    // Scroll-into-view request slot.

    pub fn request_scroll(&mut self, node: NodeId) {
        self.scroll_to = Some(node);
    }

    pub fn take_scroll(&mut self) -> Option<NodeId> {
        self.scroll_to.take()
    }

    fn add(&mut self, node: NodeId) {
        if self.selected_set.insert(node) {
            self.selected.push(node);
        }
    }

    fn remove(&mut self, node: NodeId) {
        if self.selected_set.remove(&node) {
            self.selected.retain(|&n| n != node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Relation;
    use std::collections::HashMap;

    fn tree() -> ConceptTree {
        let rel = |p: &str, c: &str| Relation {
            parent_id: p.to_string(),
            parent_name: p.to_uppercase(),
            child_id: c.to_string(),
            child_name: c.to_uppercase(),
        };
        ConceptTree::build(
            &[rel("r", "a"), rel("r", "b"), rel("b", "c")],
            &HashMap::new(),
            "r",
        )
        .unwrap()
    }

    #[test]
    fn test_plain_click_replaces_selection() {
        let t = tree();
        let (a, b) = (t.find("a").unwrap(), t.find("b").unwrap());
        let mut view = TreeViewState::new();

        view.click(a, false);
        view.click(b, false);

        assert_eq!(view.selected(), &[b]);
        let pending = view.take_pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].added, vec![a]);
        assert_eq!(pending[1].removed, vec![a]);
        assert_eq!(pending[1].added, vec![b]);
    }

    #[test]
    fn test_additive_click_toggles() {
        let t = tree();
        let (a, b) = (t.find("a").unwrap(), t.find("b").unwrap());
        let mut view = TreeViewState::new();

        view.click(a, true);
        view.click(b, true);
        view.click(a, true);

        assert_eq!(view.selected(), &[b]);
        let pending = view.take_pending();
        assert_eq!(pending[2].removed, vec![a]);
    }

    #[test]
    fn test_silent_path_records_no_gesture() {
        let t = tree();
        let a = t.find("a").unwrap();
        let mut view = TreeViewState::new();

        assert!(view.select_silent(a));
        assert!(!view.select_silent(a));
        assert!(view.deselect_silent(a));
        assert!(view.take_pending().is_empty());
    }

    #[test]
    fn test_collapse_drops_hidden_descendants_silently() {
        let t = tree();
        let (b, c) = (t.find("b").unwrap(), t.find("c").unwrap());
        let mut view = TreeViewState::new();
        view.expand(t.root());
        view.expand(b);
        view.select_silent(b);
        view.select_silent(c);

        view.collapse(b, &t);

        assert!(view.is_selected(b));
        assert!(!view.is_selected(c));
        assert!(view.take_pending().is_empty());
    }

    #[test]
    fn test_reveal_expands_ancestors_only() {
        let t = tree();
        let (b, c) = (t.find("b").unwrap(), t.find("c").unwrap());
        let mut view = TreeViewState::new();

        view.reveal(&t, c);

        assert!(view.is_expanded(t.root()));
        assert!(view.is_expanded(b));
        assert!(!view.is_expanded(c));
    }
}
