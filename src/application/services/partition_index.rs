//! Partition-scoped node lookups and path allocation
//!
//! Every structural read of the engine goes through here with an explicit
//! partition, so nodes of two menus never meet even when their paths are
//! identical.

use tracing::trace;

use crate::application::{TreeError, TreeResult};
use crate::domain::{MaterializedPath, Node, Partition, PartitionId, PathCodec};
use crate::infrastructure::{NodeFilter, NodeStore, ScanOrder};

/// Read-only view of one store, scoped per call to a partition.
pub struct PartitionIndex<'a, S> {
    store: &'a S,
    codec: &'a PathCodec,
}

impl<'a, S: NodeStore> PartitionIndex<'a, S> {
    pub fn new(store: &'a S, codec: &'a PathCodec) -> Self {
        Self { store, codec }
    }

    pub fn partition(&self, id: PartitionId) -> TreeResult<Partition> {
        self.store
            .partition(id)?
            .ok_or_else(|| TreeError::PartitionNotFound(id.to_string()))
    }

    pub fn by_identifier(&self, identifier: &str) -> TreeResult<Option<Partition>> {
        Ok(self
            .store
            .partitions()?
            .into_iter()
            .find(|p| p.identifier == identifier))
    }

    /// All partitions ordered by group, then identifier.
    pub fn partitions(&self) -> TreeResult<Vec<Partition>> {
        let mut partitions = self.store.partitions()?;
        partitions.sort_by(|a, b| {
            a.group
                .cmp(&b.group)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        Ok(partitions)
    }

    /// Depth-1 nodes of `partition`, ordered by sort weight.
    pub fn root_nodes(&self, partition: PartitionId) -> TreeResult<Vec<Node<S::Payload>>> {
        self.partition(partition)?;
        let roots = self.store.scan(
            &NodeFilter::children_of(partition, MaterializedPath::root(), 0),
            ScanOrder::SortWeight,
        )?;
        trace!("root_nodes: {} in {}", roots.len(), partition);
        Ok(roots)
    }

    pub fn exists(&self, partition: PartitionId, path: &MaterializedPath) -> TreeResult<bool> {
        Ok(self.find(partition, path)?.is_some())
    }

    pub fn find(&self, partition: PartitionId, path: &MaterializedPath) -> TreeResult<Option<Node<S::Payload>>> {
        self.codec.decode(path)?;
        if path.is_root() {
            return Ok(None);
        }
        Ok(self
            .store
            .scan(&NodeFilter::exact(partition, path.clone()), ScanOrder::Path)?
            .into_iter()
            .next())
    }

    /// The node at `root` and all its descendants, in path order.
    pub fn subtree(&self, partition: PartitionId, root: &MaterializedPath) -> TreeResult<Vec<Node<S::Payload>>> {
        Ok(self
            .store
            .scan(&NodeFilter::subtree_of(partition, root.clone()), ScanOrder::Path)?)
    }

    /// Every node of `partition`, in path order.
    pub fn all_nodes(&self, partition: PartitionId) -> TreeResult<Vec<Node<S::Payload>>> {
        Ok(self.store.scan(&NodeFilter::all(partition), ScanOrder::Path)?)
    }

    /// Next free child path below `parent`: highest existing ordinal + 1.
    pub fn next_child_path(
        &self,
        partition: PartitionId,
        parent: &MaterializedPath,
    ) -> TreeResult<MaterializedPath> {
        let depth = self.codec.depth_of(parent)?;
        let children = self.store.scan(
            &NodeFilter::children_of(partition, parent.clone(), depth),
            ScanOrder::Path,
        )?;
        let mut highest = 0;
        for child in &children {
            if let Some(ordinal) = self.codec.last_ordinal(&child.path)? {
                highest = highest.max(ordinal);
            }
        }
        Ok(self.codec.child_path(parent, highest + 1)?)
    }

    /// Fail unless `node` lives in `partition`.
    pub fn ensure_member(&self, node: &Node<S::Payload>, partition: PartitionId) -> TreeResult<()> {
        if node.partition != partition {
            return Err(TreeError::PartitionMismatch {
                node: node.id,
                expected: partition,
                actual: node.partition,
            });
        }
        Ok(())
    }
}
