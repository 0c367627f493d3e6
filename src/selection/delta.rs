//! Change notification value
//!
//! Every observable in the selection core reports changes as an explicit
//! added/removed pair instead of full snapshots, so subscribers can apply
//! incremental updates and batches stay atomic.

/// One batched change: what entered and what left, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> Delta<T> {
    pub fn new() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn added(items: Vec<T>) -> Self {
        Self {
            added: items,
            removed: Vec::new(),
        }
    }

    pub fn removed(items: Vec<T>) -> Self {
        Self {
            added: Vec::new(),
            removed: items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl<T> Default for Delta<T> {
    fn default() -> Self {
        Self::new()
    }
}
