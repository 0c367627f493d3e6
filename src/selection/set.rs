//! Canonical mesh selection
//!
//! The single source of truth every view converges to: an ordered set of
//! selected mesh handles. Insertion order is meaningful (the most recently
//! selected mesh drives scroll/framing); membership is set-like. Each
//! mutator applies one batch and emits at most one change notification —
//! per-item events would let multi-subscriber tree state collapse between
//! rounds.

use std::collections::HashSet;

use crate::mesh::MeshHandle;

use super::delta::Delta;

type Listener = Box<dyn FnMut(&Delta<MeshHandle>)>;

/// Observable, order-preserving set of selected mesh handles
#[derive(Default)]
pub struct MeshSelectionSet {
    order: Vec<MeshHandle>,
    present: HashSet<MeshHandle>,
    listeners: Vec<Listener>,
}

impl MeshSelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a change listener.
    ///
    /// Listeners observe an ordered sequence of deltas, one per applied
    /// batch. Re-entrant invocation is prevented by the synchronizer's
    /// guard, not here.
    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Selects one handle; no-op (and no notification) if already present.
    pub fn select(&mut self, handle: MeshHandle) -> Delta<MeshHandle> {
        self.select_all([handle])
    }

    /// Deselects one handle; no-op if absent.
    pub fn deselect(&mut self, handle: MeshHandle) -> Delta<MeshHandle> {
        self.deselect_all([handle])
    }

    /// Selects a batch, filtering handles already present, preserving the
    /// input order of the rest. One notification for the whole batch.
    pub fn select_all(
        &mut self,
        batch: impl IntoIterator<Item = MeshHandle>,
    ) -> Delta<MeshHandle> {
        let mut added = Vec::new();
        for handle in batch {
            if self.present.insert(handle) {
                self.order.push(handle);
                added.push(handle);
            }
        }
        let delta = Delta::added(added);
        self.notify(&delta);
        delta
    }

    /// Deselects a batch; absent handles are ignored. One notification.
    pub fn deselect_all(
        &mut self,
        batch: impl IntoIterator<Item = MeshHandle>,
    ) -> Delta<MeshHandle> {
        let mut removed = Vec::new();
        for handle in batch {
            if self.present.remove(&handle) {
                removed.push(handle);
            }
        }
        if !removed.is_empty() {
            self.order.retain(|h| self.present.contains(h));
        }
        let delta = Delta::removed(removed);
        self.notify(&delta);
        delta
    }

    /// Removes everything in one notification carrying the full removed
    /// delta.
    pub fn clear(&mut self) -> Delta<MeshHandle> {
        let removed = std::mem::take(&mut self.order);
        self.present.clear();
        let delta = Delta::removed(removed);
        self.notify(&delta);
        delta
    }

    pub fn contains(&self, handle: MeshHandle) -> bool {
        self.present.contains(&handle)
    }

    /// Selected handles in insertion order
    pub fn iter(&self) -> impl Iterator<Item = MeshHandle> + '_ {
        self.order.iter().copied()
    }

    /// Most recently selected handle
    pub fn last(&self) -> Option<MeshHandle> {
        self.order.last().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn notify(&mut self, delta: &Delta<MeshHandle>) {
        if delta.is_empty() {
            return;
        }
        // Listeners may inspect the set; detach the list while running them.
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            listener(delta);
        }
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn h(i: u32) -> MeshHandle {
        MeshHandle(i)
    }

    fn recording(set: &mut MeshSelectionSet) -> Rc<RefCell<Vec<Delta<MeshHandle>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        set.subscribe(Box::new(move |delta| sink.borrow_mut().push(delta.clone())));
        log
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut set = MeshSelectionSet::new();
        let log = recording(&mut set);

        set.select(h(1));
        set.select(h(1));

        assert_eq!(set.len(), 1);
        // The second call produced no notification
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0], Delta::added(vec![h(1)]));
    }

    #[test]
    fn test_select_all_batch_atomicity() {
        let mut set = MeshSelectionSet::new();
        set.select(h(2));
        let log = recording(&mut set);

        let delta = set.select_all([h(1), h(2), h(3)]);

        assert_eq!(delta.added, vec![h(1), h(3)]);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].added, vec![h(1), h(3)]);
    }

    #[test]
    fn test_deselect_all_ignores_absent() {
        let mut set = MeshSelectionSet::new();
        set.select_all([h(1), h(2)]);
        let log = recording(&mut set);

        let delta = set.deselect_all([h(2), h(9)]);

        assert_eq!(delta.removed, vec![h(2)]);
        assert_eq!(log.borrow().len(), 1);
        assert!(set.contains(h(1)));
        assert!(!set.contains(h(2)));
    }

    #[test]
    fn test_insertion_order_and_last() {
        let mut set = MeshSelectionSet::new();
        set.select_all([h(3), h(1)]);
        set.select(h(2));
        set.deselect(h(1));

        let order: Vec<MeshHandle> = set.iter().collect();
        assert_eq!(order, vec![h(3), h(2)]);
        assert_eq!(set.last(), Some(h(2)));
    }

    #[test]
    fn test_clear_emits_full_removed_delta() {
        let mut set = MeshSelectionSet::new();
        set.select_all([h(1), h(2), h(3)]);
        let log = recording(&mut set);

        let delta = set.clear();

        assert_eq!(delta.removed, vec![h(1), h(2), h(3)]);
        assert_eq!(log.borrow().len(), 1);
        assert!(set.is_empty());

        // Clearing an empty set stays silent
        set.clear();
        assert_eq!(log.borrow().len(), 1);
    }
}
