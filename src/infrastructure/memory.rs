//! In-memory transactional store
//!
//! Rows live in generational arenas; a per-partition `BTreeMap` from path to
//! row gives ordered prefix scans. A transaction snapshots all tables on
//! `begin` and restores them on `rollback`.

use std::collections::{BTreeMap, HashMap};

use generational_arena::{Arena, Index};
use tracing::trace;

use crate::domain::{MaterializedPath, Node, NodeId, NodeRecord, Partition, PartitionId, PartitionRecord};
use crate::infrastructure::error::{StorageError, StorageResult};
use crate::infrastructure::traits::{NodeFilter, NodeStore, NodeUpdate, PathMatch, ScanOrder};

#[derive(Debug, Clone)]
struct Tables<P> {
    partitions: Arena<PartitionRecord>,
    nodes: Arena<NodeRecord<P>>,
    /// (partition, path) -> row; the uniqueness index.
    paths: HashMap<PartitionId, BTreeMap<MaterializedPath, Index>>,
}

impl<P> Default for Tables<P> {
    fn default() -> Self {
        Self {
            partitions: Arena::new(),
            nodes: Arena::new(),
            paths: HashMap::new(),
        }
    }
}

/// Arena-backed [`NodeStore`] with snapshot transactions.
#[derive(Debug)]
pub struct MemoryStore<P> {
    tables: Tables<P>,
    journal: Option<Box<Tables<P>>>,
}

impl<P> Default for MemoryStore<P> {
    fn default() -> Self {
        Self {
            tables: Tables::default(),
            journal: None,
        }
    }
}

impl<P: Clone> MemoryStore<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.tables.nodes.len()
    }

    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    /// Row indices matching `filter`, in path order.
    fn matching(&self, filter: &NodeFilter) -> Vec<Index> {
        let Some(paths) = self.tables.paths.get(&filter.partition()) else {
            return Vec::new();
        };
        let candidates: Vec<Index> = match filter.paths() {
            PathMatch::All => paths.values().copied().collect(),
            PathMatch::Exact(path) => paths.get(path).copied().into_iter().collect(),
            PathMatch::ChildrenOf { parent, .. } | PathMatch::SubtreeOf(parent) => paths
                .range(parent.clone()..)
                .take_while(|(path, _)| path.starts_with(parent))
                .map(|(_, idx)| *idx)
                .collect(),
        };
        candidates
            .into_iter()
            .filter(|idx| {
                self.tables
                    .nodes
                    .get(*idx)
                    .map(|record| filter.matches(record))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn partition_label(&self, id: PartitionId) -> String {
        self.tables
            .partitions
            .get(id.index())
            .map(|p| p.identifier.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

impl<P: Clone> NodeStore for MemoryStore<P> {
    type Payload = P;

    fn begin(&mut self) -> StorageResult<()> {
        if self.journal.is_some() {
            return Err(StorageError::TransactionActive);
        }
        trace!("begin: snapshot {} nodes", self.tables.nodes.len());
        self.journal = Some(Box::new(self.tables.clone()));
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.journal.take().ok_or(StorageError::NoTransaction)?;
        trace!("commit");
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        let saved = self.journal.take().ok_or(StorageError::NoTransaction)?;
        self.tables = *saved;
        trace!("rollback: restored {} nodes", self.tables.nodes.len());
        Ok(())
    }

    fn insert_partition(&mut self, record: PartitionRecord) -> StorageResult<PartitionId> {
        if self
            .tables
            .partitions
            .iter()
            .any(|(_, p)| p.identifier == record.identifier)
        {
            return Err(StorageError::UniqueViolation {
                partition: "menus".into(),
                key: record.identifier,
            });
        }
        let id = PartitionId::from_index(self.tables.partitions.insert(record));
        self.tables.paths.insert(id, BTreeMap::new());
        Ok(id)
    }

    fn partition(&self, id: PartitionId) -> StorageResult<Option<Partition>> {
        Ok(self
            .tables
            .partitions
            .get(id.index())
            .map(|record| Partition::from_record(id, record.clone())))
    }

    fn partitions(&self) -> StorageResult<Vec<Partition>> {
        Ok(self
            .tables
            .partitions
            .iter()
            .map(|(idx, record)| Partition::from_record(PartitionId::from_index(idx), record.clone()))
            .collect())
    }

    fn delete_partition(&mut self, id: PartitionId) -> StorageResult<bool> {
        if self.tables.partitions.remove(id.index()).is_none() {
            return Ok(false);
        }
        if let Some(paths) = self.tables.paths.remove(&id) {
            for idx in paths.into_values() {
                self.tables.nodes.remove(idx);
            }
        }
        Ok(true)
    }

    fn insert_node(&mut self, record: NodeRecord<P>) -> StorageResult<NodeId> {
        let label = self.partition_label(record.partition);
        let paths = self
            .tables
            .paths
            .get_mut(&record.partition)
            .ok_or_else(|| StorageError::ForeignKeyViolation(format!("no partition {}", label)))?;
        if paths.contains_key(&record.path) {
            return Err(StorageError::UniqueViolation {
                partition: label,
                key: record.path.to_string(),
            });
        }
        let path = record.path.clone();
        let idx = self.tables.nodes.insert(record);
        paths.insert(path, idx);
        Ok(NodeId::from_index(idx))
    }

    fn node(&self, id: NodeId) -> StorageResult<Option<Node<P>>> {
        Ok(self
            .tables
            .nodes
            .get(id.index())
            .map(|record| Node::from_record(id, record.clone())))
    }

    fn update_node(&mut self, id: NodeId, update: NodeUpdate<P>) -> StorageResult<()> {
        let (partition, old_path) = self
            .tables
            .nodes
            .get(id.index())
            .map(|r| (r.partition, r.path.clone()))
            .ok_or_else(|| StorageError::RowNotFound(id.to_string()))?;
        if update.is_empty() {
            return Ok(());
        }

        if let Some(new_path) = update.path.as_ref().filter(|p| **p != old_path) {
            let label = self.partition_label(partition);
            let paths = self
                .tables
                .paths
                .get_mut(&partition)
                .ok_or_else(|| StorageError::ForeignKeyViolation(format!("no partition {}", label)))?;
            if paths.contains_key(new_path) {
                return Err(StorageError::UniqueViolation {
                    partition: label,
                    key: new_path.to_string(),
                });
            }
            paths.remove(&old_path);
            paths.insert(new_path.clone(), id.index());
        }

        // Existence checked above.
        if let Some(record) = self.tables.nodes.get_mut(id.index()) {
            if let Some(path) = update.path {
                record.path = path;
            }
            if let Some(depth) = update.depth {
                record.depth = depth;
            }
            if let Some(count) = update.child_count {
                record.child_count = count;
            }
            if let Some(weight) = update.sort_weight {
                record.sort_weight = weight;
            }
            if let Some(payload) = update.payload {
                record.payload = payload;
            }
        }
        Ok(())
    }

    fn delete_nodes(&mut self, filter: &NodeFilter) -> StorageResult<usize> {
        let doomed = self.matching(filter);
        let paths = self.tables.paths.get_mut(&filter.partition());
        let mut removed = 0;
        if let Some(paths) = paths {
            for idx in &doomed {
                if let Some(record) = self.tables.nodes.remove(*idx) {
                    paths.remove(&record.path);
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    fn scan(&self, filter: &NodeFilter, order: ScanOrder) -> StorageResult<Vec<Node<P>>> {
        let mut nodes: Vec<Node<P>> = self
            .matching(filter)
            .into_iter()
            .filter_map(|idx| {
                self.tables
                    .nodes
                    .get(idx)
                    .map(|record| Node::from_record(NodeId::from_index(idx), record.clone()))
            })
            .collect();
        if order == ScanOrder::SortWeight {
            // Stable: equal weights keep path order.
            nodes.sort_by_key(|n| n.sort_weight);
        }
        Ok(nodes)
    }
}
