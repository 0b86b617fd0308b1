//! Parent resolution with per-node memoization

use tracing::trace;

use crate::application::TreeResult;
use crate::domain::{Node, PathCodec};
use crate::infrastructure::{NodeFilter, NodeStore, ScanOrder, StorageError};

/// Resolves parents through the partition-scoped path lookup and memoizes
/// the result in the node's [`ParentCache`](crate::domain::ParentCache).
pub struct ParentResolver<'a, S> {
    store: &'a S,
    codec: &'a PathCodec,
}

impl<'a, S: NodeStore> ParentResolver<'a, S> {
    pub fn new(store: &'a S, codec: &'a PathCodec) -> Self {
        Self { store, codec }
    }

    /// Parent of `node`, `None` for top-level nodes.
    ///
    /// `force_refresh` discards the memoized value first.
    pub fn parent_of(
        &self,
        node: &mut Node<S::Payload>,
        force_refresh: bool,
    ) -> TreeResult<Option<Node<S::Payload>>> {
        if force_refresh {
            node.parent.invalidate();
        }
        if let Some(cached) = node.parent.get() {
            return Ok(cached.cloned());
        }

        let parent = match self.codec.parent_path_of(&node.path)? {
            None => None,
            Some(parent_path) => {
                trace!("parent_of: lookup {} for {}", parent_path, node.id);
                let found = self
                    .store
                    .scan(&NodeFilter::exact(node.partition, parent_path.clone()), ScanOrder::Path)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        StorageError::RowNotFound(format!("parent {} of {}", parent_path, node.id))
                    })?;
                Some(found)
            }
        };
        node.parent.store(parent.clone());
        Ok(parent)
    }

    /// Ancestors of `node`, root first. Reuses every memoized parent on the way up.
    pub fn ancestors(&self, node: &mut Node<S::Payload>) -> TreeResult<Vec<Node<S::Payload>>> {
        let mut chain = Vec::with_capacity(node.depth.saturating_sub(1));
        let mut next = self.parent_of(node, false)?;
        while let Some(mut ancestor) = next {
            next = self.parent_of(&mut ancestor, false)?;
            chain.push(ancestor);
        }
        chain.reverse();
        Ok(chain)
    }
}
