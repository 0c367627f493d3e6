//! Per-view selection binding
//!
//! Adapts one tree panel's widget state to file-id semantics. The binding
//! keeps its own belief of what should be selected (`true_selection`),
//! separate from the widget's live selection: the widget can lose entries
//! to UI-level side effects (collapse auto-deselect) or gain entries no
//! canonical selection backs. The reconciliation pass removes those ghost
//! selections and restores the missing ones after every canonical-driven
//! update.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::concept::{ConceptTree, NodeId};

use super::tree_state::TreeViewState;

/// Binding between one concept tree and its panel state
pub struct TreeViewBinding {
    tree: Rc<ConceptTree>,
    view: Rc<RefCell<TreeViewState>>,
    file_to_nodes: HashMap<String, Vec<NodeId>>,
    true_selection: HashSet<NodeId>,
    syncing: bool,
}

impl TreeViewBinding {
    /// Binds a view to a tree, running the one-time mapping pass: every
    /// node carrying file ids is registered under each of them. One file id
    /// may label several nodes; selecting its mesh selects all of them.
    pub fn bind(tree: Rc<ConceptTree>, view: Rc<RefCell<TreeViewState>>) -> Self {
        let mut file_to_nodes: HashMap<String, Vec<NodeId>> = HashMap::new();
        tree.visit_preorder(tree.root(), &mut |id, node| {
            for file_id in &node.file_ids {
                let nodes = file_to_nodes.entry(file_id.clone()).or_default();
                if !nodes.contains(&id) {
                    nodes.push(id);
                }
            }
        });

        Self {
            tree,
            view,
            file_to_nodes,
            true_selection: HashSet::new(),
            syncing: false,
        }
    }

    pub fn tree(&self) -> &ConceptTree {
        &self.tree
    }

    pub(crate) fn tree_rc(&self) -> Rc<ConceptTree> {
        Rc::clone(&self.tree)
    }

    pub fn view(&self) -> Rc<RefCell<TreeViewState>> {
        Rc::clone(&self.view)
    }

    /// Nodes registered for a file id; empty when the id labels nothing in
    /// this tree.
    pub fn nodes_for(&self, file_id: &str) -> &[NodeId] {
        self.file_to_nodes
            .get(file_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    pub(crate) fn set_syncing(&mut self, syncing: bool) {
        self.syncing = syncing;
    }

    pub fn true_selection(&self) -> &HashSet<NodeId> {
        &self.true_selection
    }

    /// Programmatic select: widget and tracker together.
    pub fn select_in_bound_tree(&mut self, node: NodeId) {
        self.view.borrow_mut().select_silent(node);
        self.true_selection.insert(node);
    }

    /// Programmatic deselect: widget and tracker together.
    pub fn clear_in_bound_tree(&mut self, node: NodeId) {
        self.view.borrow_mut().deselect_silent(node);
        self.true_selection.remove(&node);
    }

    /// Reconciliation pass.
    ///
    /// Ghosts (widget-selected, untracked) are cleared; missing entries
    /// (tracked, lost by the widget) are re-selected, leaves only. Runs
    /// after every canonical-driven update; idempotent.
    pub fn cleanup_tree_view(&mut self) {
        let mut view = self.view.borrow_mut();

        let ghosts: Vec<NodeId> = view
            .selected()
            .iter()
            .copied()
            .filter(|n| !self.true_selection.contains(n))
            .collect();
        for ghost in ghosts {
            view.deselect_silent(ghost);
        }

        let missing: Vec<NodeId> = self
            .true_selection
            .iter()
            .copied()
            .filter(|&n| self.tree.is_leaf(n) && !view.is_selected(n))
            .collect();
        for node in missing {
            view.select_silent(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Relation;
    use std::collections::HashMap;

    // root R -> A(f1), B(f1, f2), section S -> C(f3)
    fn fixture() -> (Rc<ConceptTree>, Rc<RefCell<TreeViewState>>) {
        let rel = |p: &str, c: &str| Relation {
            parent_id: p.to_string(),
            parent_name: p.to_uppercase(),
            child_id: c.to_string(),
            child_name: c.to_uppercase(),
        };
        let mut files = HashMap::new();
        files.insert("a".to_string(), vec!["f1".to_string()]);
        files.insert("b".to_string(), vec!["f1".to_string(), "f2".to_string()]);
        files.insert("c".to_string(), vec!["f3".to_string()]);
        let tree = ConceptTree::build(
            &[rel("r", "a"), rel("r", "b"), rel("r", "s"), rel("s", "c")],
            &files,
            "r",
        )
        .unwrap();
        (Rc::new(tree), Rc::new(RefCell::new(TreeViewState::new())))
    }

    #[test]
    fn test_mapping_registers_multi_labelled_ids() {
        let (tree, view) = fixture();
        let binding = TreeViewBinding::bind(Rc::clone(&tree), view);

        let f1_nodes = binding.nodes_for("f1");
        assert_eq!(f1_nodes.len(), 2);
        assert!(f1_nodes.contains(&tree.find("a").unwrap()));
        assert!(f1_nodes.contains(&tree.find("b").unwrap()));
        assert_eq!(binding.nodes_for("f2").len(), 1);
        assert!(binding.nodes_for("unknown").is_empty());
    }

    #[test]
    fn test_select_and_clear_track_both_sides() {
        let (tree, view) = fixture();
        let mut binding = TreeViewBinding::bind(tree.clone(), Rc::clone(&view));
        let a = tree.find("a").unwrap();

        binding.select_in_bound_tree(a);
        assert!(view.borrow().is_selected(a));
        assert!(binding.true_selection().contains(&a));

        binding.clear_in_bound_tree(a);
        assert!(!view.borrow().is_selected(a));
        assert!(!binding.true_selection().contains(&a));
    }

    #[test]
    fn test_cleanup_clears_ghosts() {
        let (tree, view) = fixture();
        let mut binding = TreeViewBinding::bind(tree.clone(), Rc::clone(&view));
        let (a, s) = (tree.find("a").unwrap(), tree.find("s").unwrap());

        // Widget-only selections the binding never asked for
        view.borrow_mut().select_silent(a);
        view.borrow_mut().select_silent(s);

        binding.cleanup_tree_view();

        assert!(!view.borrow().is_selected(a));
        assert!(!view.borrow().is_selected(s));
    }

    #[test]
    fn test_cleanup_restores_missing_leaves_only() {
        let (tree, view) = fixture();
        let mut binding = TreeViewBinding::bind(tree.clone(), Rc::clone(&view));
        let (a, s, c) = (
            tree.find("a").unwrap(),
            tree.find("s").unwrap(),
            tree.find("c").unwrap(),
        );

        binding.select_in_bound_tree(a);
        binding.select_in_bound_tree(c);
        binding.true_selection.insert(s); // tracked internal node

        // Widget lost everything (e.g. full collapse)
        view.borrow_mut().clear_silent();

        binding.cleanup_tree_view();

        assert!(view.borrow().is_selected(a));
        assert!(view.borrow().is_selected(c));
        // Internal nodes are never re-added by reconciliation
        assert!(!view.borrow().is_selected(s));
    }

    #[test]
    fn test_cleanup_converges_in_one_pass() {
        let (tree, view) = fixture();
        let mut binding = TreeViewBinding::bind(tree.clone(), Rc::clone(&view));
        let (a, b, c) = (
            tree.find("a").unwrap(),
            tree.find("b").unwrap(),
            tree.find("c").unwrap(),
        );

        binding.select_in_bound_tree(a);
        binding.select_in_bound_tree(b);
        view.borrow_mut().deselect_silent(b); // missing
        view.borrow_mut().select_silent(c); // ghost

        binding.cleanup_tree_view();

        let view = view.borrow();
        let mut ui: Vec<NodeId> = view.selected().to_vec();
        let mut tracked: Vec<NodeId> = binding.true_selection().iter().copied().collect();
        ui.sort();
        tracked.sort();
        assert_eq!(ui, tracked);
    }
}
