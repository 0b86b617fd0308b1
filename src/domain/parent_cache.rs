//! Per-node memo of the resolved parent

use crate::domain::entities::Node;

/// Optional memo of a node's parent lookup.
///
/// Distinguishes "not looked up yet" from "looked up, node is top-level".
/// Purely an optimization; dropping it never changes results.
#[derive(Debug, Clone)]
pub struct ParentCache<P> {
    slot: Option<Option<Box<Node<P>>>>,
}

impl<P> Default for ParentCache<P> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<P> ParentCache<P> {
    /// `None` if nothing is memoized, `Some(None)` for a memoized "no parent".
    pub fn get(&self) -> Option<Option<&Node<P>>> {
        self.slot.as_ref().map(|parent| parent.as_deref())
    }

    pub fn store(&mut self, parent: Option<Node<P>>) {
        self.slot = Some(parent.map(Box::new));
    }

    /// Forget the memoized value; the next lookup hits the store.
    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    pub fn is_cached(&self) -> bool {
        self.slot.is_some()
    }
}
