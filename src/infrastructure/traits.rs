//! Backing store boundary
//!
//! The tree engine talks to storage only through [`NodeStore`]. Every node
//! query is a [`NodeFilter`], and a filter cannot be built without a
//! partition: there is no way to ask the store for "all nodes at path X"
//! across partitions.

use crate::domain::{MaterializedPath, Node, NodeId, NodeRecord, Partition, PartitionId, PartitionRecord};
use crate::infrastructure::error::StorageResult;

/// Which paths of a partition a filter selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    /// Every node of the partition.
    All,
    /// The node at exactly this path.
    Exact(MaterializedPath),
    /// Direct children of `parent` (the root path selects depth-1 nodes).
    ChildrenOf {
        parent: MaterializedPath,
        depth: usize,
    },
    /// The node at this path and everything below it.
    SubtreeOf(MaterializedPath),
}

/// Partition-scoped node selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFilter {
    partition: PartitionId,
    paths: PathMatch,
}

impl NodeFilter {
    pub fn all(partition: PartitionId) -> Self {
        Self {
            partition,
            paths: PathMatch::All,
        }
    }

    pub fn exact(partition: PartitionId, path: MaterializedPath) -> Self {
        Self {
            partition,
            paths: PathMatch::Exact(path),
        }
    }

    /// Children of the node at `parent`, which lives at `parent_depth`.
    pub fn children_of(partition: PartitionId, parent: MaterializedPath, parent_depth: usize) -> Self {
        Self {
            partition,
            paths: PathMatch::ChildrenOf {
                parent,
                depth: parent_depth + 1,
            },
        }
    }

    pub fn subtree_of(partition: PartitionId, root: MaterializedPath) -> Self {
        Self {
            partition,
            paths: PathMatch::SubtreeOf(root),
        }
    }

    pub fn partition(&self) -> PartitionId {
        self.partition
    }

    pub fn paths(&self) -> &PathMatch {
        &self.paths
    }

    /// Row-level predicate, for stores that evaluate filters themselves.
    pub fn matches<P>(&self, record: &NodeRecord<P>) -> bool {
        if record.partition != self.partition {
            return false;
        }
        match &self.paths {
            PathMatch::All => true,
            PathMatch::Exact(path) => &record.path == path,
            PathMatch::ChildrenOf { parent, depth } => {
                record.depth == *depth && record.path.is_descendant_of(parent)
            }
            PathMatch::SubtreeOf(root) => record.path.starts_with(root),
        }
    }
}

/// Result ordering of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    /// Ascending path (depth-first, pre-order).
    Path,
    /// Ascending sort weight, ties broken by path.
    SortWeight,
}

/// Column changes for one node row. `None` leaves a column untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate<P> {
    pub path: Option<MaterializedPath>,
    pub depth: Option<usize>,
    pub child_count: Option<usize>,
    pub sort_weight: Option<u32>,
    pub payload: Option<P>,
}

impl<P> Default for NodeUpdate<P> {
    fn default() -> Self {
        Self {
            path: None,
            depth: None,
            child_count: None,
            sort_weight: None,
            payload: None,
        }
    }
}

impl<P> NodeUpdate<P> {
    pub fn sort_weight(weight: u32) -> Self {
        Self {
            sort_weight: Some(weight),
            ..Self::default()
        }
    }

    pub fn child_count(count: usize) -> Self {
        Self {
            child_count: Some(count),
            ..Self::default()
        }
    }

    pub fn relocate(path: MaterializedPath, depth: usize) -> Self {
        Self {
            path: Some(path),
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn payload(payload: P) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none()
            && self.depth.is_none()
            && self.child_count.is_none()
            && self.sort_weight.is_none()
            && self.payload.is_none()
    }
}

/// Transactional store of partitions and their nodes.
///
/// Implementations must keep `(partition, path)` unique, reject nodes whose
/// partition does not exist, and make everything between [`begin`] and
/// [`rollback`] invisible after the rollback.
///
/// [`begin`]: NodeStore::begin
/// [`rollback`]: NodeStore::rollback
pub trait NodeStore {
    /// Opaque payload carried by every node.
    type Payload: Clone;

    fn begin(&mut self) -> StorageResult<()>;

    fn commit(&mut self) -> StorageResult<()>;

    fn rollback(&mut self) -> StorageResult<()>;

    fn insert_partition(&mut self, record: PartitionRecord) -> StorageResult<PartitionId>;

    fn partition(&self, id: PartitionId) -> StorageResult<Option<Partition>>;

    fn partitions(&self) -> StorageResult<Vec<Partition>>;

    /// Remove a partition and all of its nodes. Returns false if it did not exist.
    fn delete_partition(&mut self, id: PartitionId) -> StorageResult<bool>;

    fn insert_node(&mut self, record: NodeRecord<Self::Payload>) -> StorageResult<NodeId>;

    fn node(&self, id: NodeId) -> StorageResult<Option<Node<Self::Payload>>>;

    fn update_node(&mut self, id: NodeId, update: NodeUpdate<Self::Payload>) -> StorageResult<()>;

    /// Delete all matching nodes, returning how many were removed.
    fn delete_nodes(&mut self, filter: &NodeFilter) -> StorageResult<usize>;

    fn scan(&self, filter: &NodeFilter, order: ScanOrder) -> StorageResult<Vec<Node<Self::Payload>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use generational_arena::Index;

    fn record(partition: PartitionId, path: &str, depth: usize) -> NodeRecord<()> {
        NodeRecord {
            partition,
            path: MaterializedPath::new(path),
            depth,
            child_count: 0,
            sort_weight: 0,
            payload: (),
        }
    }

    #[test]
    fn test_filter_never_crosses_partitions() {
        let menu_a = PartitionId::from_index(Index::from_raw_parts(0, 0));
        let menu_b = PartitionId::from_index(Index::from_raw_parts(1, 0));
        let filter = NodeFilter::all(menu_a);
        assert!(filter.matches(&record(menu_a, "0001", 1)));
        assert!(!filter.matches(&record(menu_b, "0001", 1)));
    }

    #[test]
    fn test_children_filter_selects_one_level() {
        let menu = PartitionId::from_index(Index::from_raw_parts(0, 0));
        let filter = NodeFilter::children_of(menu, MaterializedPath::new("0001"), 1);
        assert!(filter.matches(&record(menu, "00010001", 2)));
        assert!(!filter.matches(&record(menu, "0001", 1)));
        assert!(!filter.matches(&record(menu, "000100010001", 3)));
        assert!(!filter.matches(&record(menu, "00020001", 2)));
    }

    #[test]
    fn test_root_children_filter() {
        let menu = PartitionId::from_index(Index::from_raw_parts(0, 0));
        let filter = NodeFilter::children_of(menu, MaterializedPath::root(), 0);
        assert!(filter.matches(&record(menu, "0001", 1)));
        assert!(!filter.matches(&record(menu, "00010001", 2)));
    }
}
