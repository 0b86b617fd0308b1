//! Ordered sibling groups and their renumbering

use tracing::trace;

use crate::application::{TreeError, TreeResult};
use crate::domain::{MaterializedPath, Node, NodeId, PartitionId, PathCodec};
use crate::infrastructure::{NodeFilter, NodeStore, NodeUpdate, ScanOrder};

/// Children of one parent within one partition, ordered by sort weight.
pub struct OrderedSiblingSet<'a, S> {
    store: &'a S,
    codec: &'a PathCodec,
}

impl<'a, S: NodeStore> OrderedSiblingSet<'a, S> {
    pub fn new(store: &'a S, codec: &'a PathCodec) -> Self {
        Self { store, codec }
    }

    /// Children of `parent`, or the root nodes when `parent` is `None`.
    ///
    /// An empty result is valid: a leaf, or a menu without items.
    pub fn children_of(
        &self,
        parent: Option<&Node<S::Payload>>,
        partition: PartitionId,
    ) -> TreeResult<Vec<Node<S::Payload>>> {
        match parent {
            Some(node) if node.partition != partition => Err(TreeError::PartitionMismatch {
                node: node.id,
                expected: partition,
                actual: node.partition,
            }),
            Some(node) => self.children_at(partition, &node.path),
            None => self.children_at(partition, &MaterializedPath::root()),
        }
    }

    /// Children of whatever lives at `parent` (the root path for top level).
    pub fn children_at(
        &self,
        partition: PartitionId,
        parent: &MaterializedPath,
    ) -> TreeResult<Vec<Node<S::Payload>>> {
        let depth = self.codec.depth_of(parent)?;
        Ok(self.store.scan(
            &NodeFilter::children_of(partition, parent.clone(), depth),
            ScanOrder::SortWeight,
        )?)
    }

    /// Rightmost child of `parent`, ignoring `excluding`.
    pub fn last_child(
        &self,
        partition: PartitionId,
        parent: &MaterializedPath,
        excluding: Option<NodeId>,
    ) -> TreeResult<Option<Node<S::Payload>>> {
        Ok(self
            .children_at(partition, parent)?
            .into_iter()
            .filter(|n| Some(n.id) != excluding)
            .last())
    }

    /// Assign weights 0, 1, 2, ... in slice order. Only rows whose weight
    /// changes are written; returns how many were.
    pub fn renumber(store: &mut S, siblings: &mut [Node<S::Payload>]) -> TreeResult<usize> {
        let Some(first) = siblings.first() else {
            return Ok(0);
        };
        let partition = first.partition;
        if let Some(stray) = siblings.iter().find(|n| n.partition != partition) {
            return Err(TreeError::PartitionMismatch {
                node: stray.id,
                expected: partition,
                actual: stray.partition,
            });
        }

        let mut written = 0;
        for (weight, node) in (0u32..).zip(siblings.iter_mut()) {
            if node.sort_weight != weight {
                store.update_node(node.id, NodeUpdate::sort_weight(weight))?;
                node.sort_weight = weight;
                written += 1;
            }
        }
        trace!("renumber: {} of {} weights changed", written, siblings.len());
        Ok(written)
    }
}
