//! Selection synchronizer
//!
//! Owns the canonical selection set, one binding per tree panel, and the
//! one-way selection list, and routes batched deltas between them. All of
//! this runs on the single UI thread; the only concurrency hazard is the
//! re-entrant callback chain (a change in one view triggering a change in
//! another), which the per-binding `isSyncing` flag suppresses. The flag is
//! checked at the top of both handler paths and always released at the end
//! of handling, changed or not.
//!
//! Instead of nested listener dispatch, updates flow through explicit
//! queues drained by [`SelectionSynchronizer::pump`], which the application
//! calls once per frame (and after programmatic batch operations). Set
//! idempotence bounds the pump: a full round that moves nothing terminates
//! it.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use log::debug;

use crate::concept::{ConceptTree, NodeId};
use crate::mesh::{MeshHandle, MeshRegistry};

use super::binding::TreeViewBinding;
use super::delta::Delta;
use super::list::SelectionListModel;
use super::set::MeshSelectionSet;
use super::tree_state::TreeViewState;

/// The leaf most recently selected by a canonical update, for
/// scroll-into-view and 3D camera framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTarget {
    pub view: usize,
    pub node: NodeId,
    pub handle: MeshHandle,
}

/// What one pump moved: the canonical deltas applied and the focus leaf
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub deltas: Vec<Delta<MeshHandle>>,
    pub focus: Option<FocusTarget>,
}

/// Two-way binding across N tree views, the canonical set and the list view
pub struct SelectionSynchronizer {
    registry: Rc<MeshRegistry>,
    selection: MeshSelectionSet,
    bindings: Vec<TreeViewBinding>,
    list: SelectionListModel,
    names_by_mesh: HashMap<MeshHandle, BTreeSet<String>>,
    pending: VecDeque<Delta<MeshHandle>>,
}

impl SelectionSynchronizer {
    /// The registry must be complete before any view is bound; the
    /// synchronizer only ever reads it.
    pub fn new(registry: Rc<MeshRegistry>) -> Self {
        Self {
            registry,
            selection: MeshSelectionSet::new(),
            bindings: Vec::new(),
            list: SelectionListModel::new(),
            names_by_mesh: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Binds a tree view and returns its index. Leaf concept names are
    /// folded into the per-mesh name table that feeds the list view.
    pub fn bind_view(
        &mut self,
        tree: Rc<ConceptTree>,
        view: Rc<RefCell<TreeViewState>>,
    ) -> usize {
        tree.visit_preorder(tree.root(), &mut |_, node| {
            if !node.is_leaf() {
                return;
            }
            for file_id in &node.file_ids {
                if let Some(handle) = self.registry.handle(file_id) {
                    self.names_by_mesh
                        .entry(handle)
                        .or_default()
                        .insert(node.name.clone());
                }
            }
        });

        self.bindings.push(TreeViewBinding::bind(tree, view));
        self.bindings.len() - 1
    }

    pub fn binding(&self, view: usize) -> &TreeViewBinding {
        &self.bindings[view]
    }

    pub fn view_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn selection(&self) -> &MeshSelectionSet {
        &self.selection
    }

    /// Registers an external listener on the canonical set.
    pub fn subscribe(&mut self, listener: Box<dyn FnMut(&Delta<MeshHandle>)>) {
        self.selection.subscribe(listener);
    }

    pub fn list(&self) -> &SelectionListModel {
        &self.list
    }

    /// Selected handles in insertion order, for command snapshots.
    pub fn selected_handles(&self) -> Vec<MeshHandle> {
        self.selection.iter().collect()
    }

    /// Routes queued changes until every view agrees with the canonical
    /// set. Call once per frame and after programmatic batch operations.
    pub fn pump(&mut self) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();
        loop {
            let mut progressed = false;

            // Tree -> canonical: translate user gestures per binding.
            for index in 0..self.bindings.len() {
                let gestures = self.bindings[index].view().borrow_mut().take_pending();
                if gestures.is_empty() {
                    continue;
                }
                progressed = true;
                if self.bindings[index].is_syncing() {
                    // Re-entrant gesture while this binding applies a
                    // programmatic change: suppressed, not errored.
                    debug!("view {index}: gestures suppressed while syncing");
                    continue;
                }
                self.bindings[index].set_syncing(true);
                self.translate_gestures(index, &gestures);
                self.bindings[index].set_syncing(false);
            }

            // Canonical -> views and list.
            while let Some(delta) = self.pending.pop_front() {
                progressed = true;
                for index in 0..self.bindings.len() {
                    if self.bindings[index].is_syncing() {
                        continue;
                    }
                    self.bindings[index].set_syncing(true);
                    if let Some(focus) = self.apply_to_view(index, &delta) {
                        outcome.focus = Some(focus);
                    }
                    self.bindings[index].set_syncing(false);
                }
                self.update_list(&delta);
                outcome.deltas.push(delta);
            }

            if !progressed {
                break;
            }
        }
        outcome
    }

    /// Tree -> canonical path: removed items contribute file ids from any
    /// node, added items from leaves only. Unresolvable file ids are
    /// skipped. One deselect batch, one select batch.
    fn translate_gestures(&mut self, index: usize, gestures: &[Delta<NodeId>]) {
        let registry = Rc::clone(&self.registry);
        let tree = self.bindings[index].tree_rc();

        let mut removed = Vec::new();
        let mut added = Vec::new();
        for gesture in gestures {
            for &node in &gesture.removed {
                for file_id in &tree.node(node).file_ids {
                    if let Some(handle) = registry.handle(file_id) {
                        removed.push(handle);
                    }
                }
            }
            for &node in &gesture.added {
                if !tree.is_leaf(node) {
                    continue;
                }
                for file_id in &tree.node(node).file_ids {
                    if let Some(handle) = registry.handle(file_id) {
                        added.push(handle);
                    }
                }
            }
        }

        let deselected = self.selection.deselect_all(removed);
        if !deselected.is_empty() {
            self.pending.push_back(deselected);
        }
        let selected = self.selection.select_all(added);
        if !selected.is_empty() {
            self.pending.push_back(selected);
        }
    }

    /// Canonical -> tree path for one view, ending with the mandatory
    /// reconciliation pass. Returns the last leaf selected, if any.
    fn apply_to_view(&mut self, index: usize, delta: &Delta<MeshHandle>) -> Option<FocusTarget> {
        let registry = Rc::clone(&self.registry);
        let tree = self.bindings[index].tree_rc();
        let binding = &mut self.bindings[index];
        let mut focus = None;

        for &handle in &delta.added {
            let nodes: Vec<NodeId> = binding.nodes_for(registry.file_id(handle)).to_vec();
            for node in nodes {
                if !tree.is_leaf(node) {
                    continue;
                }
                binding.select_in_bound_tree(node);
                focus = Some(FocusTarget {
                    view: index,
                    node,
                    handle,
                });
            }
        }
        if let Some(target) = focus {
            let view = binding.view();
            let mut view = view.borrow_mut();
            view.reveal(&tree, target.node);
            view.request_scroll(target.node);
        }

        for &handle in &delta.removed {
            let nodes: Vec<NodeId> = binding.nodes_for(registry.file_id(handle)).to_vec();
            for node in nodes {
                binding.clear_in_bound_tree(node);
            }
        }

        binding.cleanup_tree_view();
        focus
    }

    /// One-way canonical -> list update from the per-mesh name table.
    fn update_list(&mut self, delta: &Delta<MeshHandle>) {
        for handle in &delta.added {
            if let Some(names) = self.names_by_mesh.get(handle) {
                for name in names {
                    self.list.upsert(name);
                }
            }
        }
        for handle in &delta.removed {
            if let Some(names) = self.names_by_mesh.get(handle) {
                for name in names {
                    self.list.remove(name);
                }
            }
        }
    }

    /// Batch subtree selection: clears the view's tree selection, selects
    /// the whole subtree, and feeds the canonical set a constant number of
    /// batches (one deselect of stale handles, one select of the subtree's
    /// leaf handles) regardless of subtree size.
    pub fn select_subtree(&mut self, view: usize, subtree: NodeId) -> SyncOutcome {
        let registry = Rc::clone(&self.registry);
        let tree = self.bindings[view].tree_rc();
        let binding = &mut self.bindings[view];

        binding.set_syncing(true);

        let current: Vec<NodeId> = binding.view().borrow().selected().to_vec();
        for node in current {
            binding.clear_in_bound_tree(node);
        }

        let mut handles = Vec::new();
        tree.visit_preorder(subtree, &mut |id, node| {
            binding.select_in_bound_tree(id);
            if node.is_leaf() {
                for file_id in &node.file_ids {
                    if let Some(handle) = registry.handle(file_id) {
                        handles.push(handle);
                    }
                }
            }
        });

        let keep: HashSet<MeshHandle> = handles.iter().copied().collect();
        let stale: Vec<MeshHandle> = self.selection.iter().filter(|h| !keep.contains(h)).collect();
        let deselected = self.selection.deselect_all(stale);
        if !deselected.is_empty() {
            self.pending.push_back(deselected);
        }
        let selected = self.selection.select_all(handles);
        if !selected.is_empty() {
            self.pending.push_back(selected);
        }

        self.bindings[view].set_syncing(false);
        self.pump()
    }

    /// Replaces the canonical selection with `handles`, in order. Used by
    /// undo/redo to restore selection snapshots exactly.
    pub fn restore_selection(&mut self, handles: Vec<MeshHandle>) -> SyncOutcome {
        self.scrub_views();
        let cleared = self.selection.clear();
        if !cleared.is_empty() {
            self.pending.push_back(cleared);
        }
        let selected = self.selection.select_all(handles);
        if !selected.is_empty() {
            self.pending.push_back(selected);
        }
        self.pump()
    }

    /// Deselects everything everywhere.
    pub fn clear_selection(&mut self) -> SyncOutcome {
        self.restore_selection(Vec::new())
    }

    /// Runs the reconciliation pass for one view outside a canonical
    /// update, e.g. right after a collapse gesture. Idempotent.
    pub fn reconcile(&mut self, view: usize) {
        let binding = &mut self.bindings[view];
        if binding.is_syncing() {
            return;
        }
        binding.set_syncing(true);
        binding.cleanup_tree_view();
        binding.set_syncing(false);
    }

    /// Drops every tracked and widget selection, including internal nodes
    /// a subtree selection may have marked, under the guard.
    fn scrub_views(&mut self) {
        for binding in &mut self.bindings {
            binding.set_syncing(true);
            let mut nodes: Vec<NodeId> = binding.view().borrow().selected().to_vec();
            nodes.extend(binding.true_selection().iter().copied());
            for node in nodes {
                binding.clear_in_bound_tree(node);
            }
            binding.set_syncing(false);
        }
    }

    #[cfg(test)]
    pub(crate) fn binding_mut(&mut self, view: usize) -> &mut TreeViewBinding {
        &mut self.bindings[view]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Relation;
    use crate::mesh::MeshData;

    fn rel(p: &str, c: &str) -> Relation {
        Relation {
            parent_id: p.to_string(),
            parent_name: p.to_uppercase(),
            child_id: c.to_string(),
            child_name: c.to_uppercase(),
        }
    }

    fn dummy_mesh(file_id: &str) -> MeshData {
        MeshData {
            file_id: file_id.to_string(),
            positions: vec![0.0; 9],
            normals: vec![0.0; 9],
            indices: vec![0, 1, 2],
            center: [0.0; 3],
            radius: 1.0,
        }
    }

    struct Fixture {
        sync: SelectionSynchronizer,
        partof: Rc<ConceptTree>,
        isa: Rc<ConceptTree>,
        view0: Rc<RefCell<TreeViewState>>,
        view1: Rc<RefCell<TreeViewState>>,
    }

    /// part-of: R -> A(f1), B(f1,f2), S -> C(f3), D(missing file id)
    /// is-a:    I -> X(f2), Y(f3)
    fn fixture() -> Fixture {
        let mut registry = MeshRegistry::new();
        for file_id in ["f1", "f2", "f3"] {
            registry.insert(dummy_mesh(file_id));
        }
        let registry = Rc::new(registry);

        let mut partof_files = HashMap::new();
        partof_files.insert("a".to_string(), vec!["f1".to_string()]);
        partof_files.insert("b".to_string(), vec!["f1".to_string(), "f2".to_string()]);
        partof_files.insert("c".to_string(), vec!["f3".to_string()]);
        partof_files.insert("d".to_string(), vec!["zz".to_string()]);
        let partof = Rc::new(
            ConceptTree::build(
                &[
                    rel("r", "a"),
                    rel("r", "b"),
                    rel("r", "s"),
                    rel("s", "c"),
                    rel("s", "d"),
                ],
                &partof_files,
                "r",
            )
            .unwrap(),
        );

        let mut isa_files = HashMap::new();
        isa_files.insert("x".to_string(), vec!["f2".to_string()]);
        isa_files.insert("y".to_string(), vec!["f3".to_string()]);
        let isa = Rc::new(
            ConceptTree::build(&[rel("i", "x"), rel("i", "y")], &isa_files, "i").unwrap(),
        );

        let view0 = Rc::new(RefCell::new(TreeViewState::new()));
        let view1 = Rc::new(RefCell::new(TreeViewState::new()));

        let mut sync = SelectionSynchronizer::new(registry);
        sync.bind_view(Rc::clone(&partof), Rc::clone(&view0));
        sync.bind_view(Rc::clone(&isa), Rc::clone(&view1));

        Fixture {
            sync,
            partof,
            isa,
            view0,
            view1,
        }
    }

    /// For every binding, trueSelection must equal the leaf nodes
    /// registered for the currently selected handles.
    fn assert_consistent(fx: &Fixture) {
        for view in 0..fx.sync.view_count() {
            let binding = fx.sync.binding(view);
            let mut expected = HashSet::new();
            for handle in fx.sync.selection().iter() {
                let file_id = fx.sync.registry.file_id(handle);
                for &node in binding.nodes_for(file_id) {
                    if binding.tree().is_leaf(node) {
                        expected.insert(node);
                    }
                }
            }
            assert_eq!(binding.true_selection(), &expected, "view {view}");
        }
    }

    #[test]
    fn test_leaf_click_selects_canonical_and_twin_node() {
        let mut fx = fixture();
        let a = fx.partof.find("a").unwrap();
        let b = fx.partof.find("b").unwrap();

        fx.view0.borrow_mut().click(a, false);
        fx.sync.pump();

        // Canonical selection is exactly f1
        let selected: Vec<&str> = fx
            .sync
            .selection()
            .iter()
            .map(|h| fx.sync.registry.file_id(h))
            .collect();
        assert_eq!(selected, vec!["f1"]);

        // f1 also labels B, so B shows selected although only A was clicked
        assert!(fx.view0.borrow().is_selected(a));
        assert!(fx.view0.borrow().is_selected(b));
        assert_consistent(&fx);
    }

    #[test]
    fn test_selection_propagates_across_views() {
        let mut fx = fixture();
        let b = fx.partof.find("b").unwrap();
        let x = fx.isa.find("x").unwrap();

        fx.view0.borrow_mut().click(b, false);
        fx.sync.pump();

        assert_eq!(fx.sync.selection().len(), 2); // f1, f2
        assert!(fx.view1.borrow().is_selected(x)); // f2 in the other taxonomy
        assert_consistent(&fx);
    }

    #[test]
    fn test_internal_node_click_selects_no_mesh() {
        let mut fx = fixture();
        let s = fx.partof.find("s").unwrap();

        fx.view0.borrow_mut().click(s, false);
        fx.sync.pump();

        assert!(fx.sync.selection().is_empty());
        assert_consistent(&fx);
    }

    #[test]
    fn test_deselect_clears_all_mapped_nodes() {
        let mut fx = fixture();
        let a = fx.partof.find("a").unwrap();
        let b = fx.partof.find("b").unwrap();

        fx.view0.borrow_mut().click(a, false);
        fx.sync.pump();
        assert!(fx.view0.borrow().is_selected(b));

        // Additive click removes A; f1 goes, and so must B
        fx.view0.borrow_mut().click(a, true);
        fx.sync.pump();

        assert!(fx.sync.selection().is_empty());
        assert!(!fx.view0.borrow().is_selected(a));
        assert!(!fx.view0.borrow().is_selected(b));
        assert_consistent(&fx);
    }

    #[test]
    fn test_unresolvable_file_id_is_skipped() {
        let mut fx = fixture();
        let d = fx.partof.find("d").unwrap();

        fx.view0.borrow_mut().click(d, false);
        fx.sync.pump();

        assert!(fx.sync.selection().is_empty());
    }

    #[test]
    fn test_select_subtree_constant_batches() {
        let mut fx = fixture();
        let a = fx.partof.find("a").unwrap();
        let s = fx.partof.find("s").unwrap();
        let c = fx.partof.find("c").unwrap();

        fx.view0.borrow_mut().click(a, false);
        fx.sync.pump();

        let notifications = Rc::new(RefCell::new(0usize));
        let counter = Rc::clone(&notifications);
        fx.sync.subscribe(Box::new(move |_| *counter.borrow_mut() += 1));

        fx.sync.select_subtree(0, s);

        // One deselect batch (stale f1) + one select batch (f3), however
        // large the subtree
        assert_eq!(*notifications.borrow(), 2);

        let selected: Vec<&str> = fx
            .sync
            .selection()
            .iter()
            .map(|h| fx.sync.registry.file_id(h))
            .collect();
        assert_eq!(selected, vec!["f3"]);

        // Every visited node is selected in the widget, internal included
        assert!(fx.view0.borrow().is_selected(s));
        assert!(fx.view0.borrow().is_selected(c));
        assert!(!fx.view0.borrow().is_selected(a));

        // The other taxonomy followed: f3 labels Y
        let y = fx.isa.find("y").unwrap();
        assert!(fx.view1.borrow().is_selected(y));
    }

    #[test]
    fn test_list_is_one_way_and_name_tagged() {
        let mut fx = fixture();
        let b = fx.partof.find("b").unwrap();

        fx.view0.borrow_mut().click(b, false);
        fx.sync.pump();

        // f1 is named by leaves A and B, f2 by B and X
        let names: Vec<&str> = fx.sync.list().entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "X"]);

        fx.view0.borrow_mut().click(b, true);
        fx.sync.pump();
        assert!(fx.sync.list().is_empty());
    }

    #[test]
    fn test_reconcile_restores_collapse_losses() {
        let mut fx = fixture();
        let a = fx.partof.find("a").unwrap();
        let b = fx.partof.find("b").unwrap();
        let r = fx.partof.root();

        fx.view0.borrow_mut().click(a, false);
        fx.sync.pump();

        // Collapse silently drops the hidden selections from the widget
        fx.view0.borrow_mut().collapse(r, &fx.partof);
        assert!(!fx.view0.borrow().is_selected(a));

        fx.sync.reconcile(0);

        assert!(fx.view0.borrow().is_selected(a));
        assert!(fx.view0.borrow().is_selected(b));
        assert_consistent(&fx);
    }

    #[test]
    fn test_gestures_suppressed_while_syncing() {
        let mut fx = fixture();
        let a = fx.partof.find("a").unwrap();

        fx.sync.binding_mut(0).set_syncing(true);
        fx.view0.borrow_mut().click(a, false);
        fx.sync.pump();

        // The re-entrant gesture was discarded, not queued
        assert!(fx.sync.selection().is_empty());

        fx.sync.binding_mut(0).set_syncing(false);
        fx.view0.borrow_mut().click(a, false);
        fx.sync.pump();
        assert_eq!(fx.sync.selection().len(), 1);
    }

    #[test]
    fn test_restore_selection_round_trips_order() {
        let mut fx = fixture();
        let b = fx.partof.find("b").unwrap();

        fx.view0.borrow_mut().click(b, false);
        fx.sync.pump();
        let snapshot = fx.sync.selected_handles();
        assert_eq!(snapshot.len(), 2);

        fx.sync.clear_selection();
        assert!(fx.sync.selection().is_empty());
        assert!(fx.sync.list().is_empty());

        fx.sync.restore_selection(snapshot.clone());
        assert_eq!(fx.sync.selected_handles(), snapshot);
        assert_consistent(&fx);
    }

    #[test]
    fn test_pump_reports_focus_for_framing() {
        let mut fx = fixture();
        let a = fx.partof.find("a").unwrap();
        let b = fx.partof.find("b").unwrap();

        fx.view0.borrow_mut().click(a, false);
        let outcome = fx.sync.pump();

        let focus = outcome.focus.expect("a leaf was selected");
        assert_eq!(focus.view, 0);
        assert_eq!(focus.node, b); // last leaf touched for f1
        assert_eq!(fx.view0.borrow_mut().take_scroll(), Some(b));
        assert!(!outcome.deltas.is_empty());
    }
}
