//! Facade over one store: the API collaborators call

use tracing::{debug, instrument};

use crate::application::services::{
    CrossPartitionPolicy, FixReport, OrderedSiblingSet, ParentResolver, PartitionIndex,
    ProblemReport, TreeInspector, TreeMutator,
};
use crate::application::{TreeError, TreeResult};
use crate::domain::{
    MaterializedPath, Node, NodeId, Partition, PartitionId, PartitionRecord, PathCodec, Position,
};
use crate::infrastructure::{NodeStore, StorageError};

/// A forest of partitioned, ordered trees backed by `S`.
pub struct MenuTree<S> {
    store: S,
    codec: PathCodec,
    policy: CrossPartitionPolicy,
}

impl<S: NodeStore> MenuTree<S> {
    pub fn new(store: S, codec: PathCodec, policy: CrossPartitionPolicy) -> Self {
        Self {
            store,
            codec,
            policy,
        }
    }

    /// Default codec, cross-partition moves rejected.
    pub fn with_store(store: S) -> Self {
        Self::new(store, PathCodec::default(), CrossPartitionPolicy::default())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    // ---------------------------------------------------------------
    // Partitions
    // ---------------------------------------------------------------

    #[instrument(level = "debug", skip(self))]
    pub fn create_partition(
        &mut self,
        identifier: &str,
        name: &str,
        group: Option<String>,
    ) -> TreeResult<Partition> {
        let record = PartitionRecord::new(identifier, name, group)?;
        if self.index().by_identifier(identifier)?.is_some() {
            return Err(TreeError::DuplicatePartition(identifier.to_string()));
        }
        let id = self.store.insert_partition(record)?;
        self.index().partition(id)
    }

    pub fn partitions(&self) -> TreeResult<Vec<Partition>> {
        self.index().partitions()
    }

    pub fn partition(&self, id: PartitionId) -> TreeResult<Partition> {
        self.index().partition(id)
    }

    pub fn partition_by_identifier(&self, identifier: &str) -> TreeResult<Partition> {
        self.index()
            .by_identifier(identifier)?
            .ok_or_else(|| TreeError::PartitionNotFound(identifier.to_string()))
    }

    /// Remove a partition together with all of its nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_partition(&mut self, id: PartitionId) -> TreeResult<()> {
        self.store.begin()?;
        let deleted = match self.store.delete_partition(id) {
            Ok(deleted) => deleted,
            Err(e) => {
                self.store.rollback()?;
                return Err(e.into());
            }
        };
        if !deleted {
            self.store.rollback()?;
            return Err(TreeError::PartitionNotFound(id.to_string()));
        }
        self.store.commit()?;
        debug!("delete_partition: {}", id);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub fn root_nodes(&self, partition: PartitionId) -> TreeResult<Vec<Node<S::Payload>>> {
        self.index().root_nodes(partition)
    }

    /// Root nodes of the menu named `identifier`; empty if there is none.
    pub fn items_for(&self, identifier: &str) -> TreeResult<Vec<Node<S::Payload>>> {
        match self.index().by_identifier(identifier)? {
            Some(partition) => self.root_nodes(partition.id),
            None => {
                debug!("items_for: no menu {:?}", identifier);
                Ok(Vec::new())
            }
        }
    }

    pub fn children_of(&self, node: &Node<S::Payload>) -> TreeResult<Vec<Node<S::Payload>>> {
        self.siblings().children_of(Some(node), node.partition)
    }

    pub fn node(&self, id: NodeId) -> TreeResult<Node<S::Payload>> {
        self.store.node(id)?.ok_or(TreeError::TargetNotFound(id))
    }

    pub fn find(&self, partition: PartitionId, path: &MaterializedPath) -> TreeResult<Option<Node<S::Payload>>> {
        self.index().find(partition, path)
    }

    /// Node at `path`, parsed and validated with the configured codec.
    pub fn find_by_path(&self, partition: PartitionId, raw_path: &str) -> TreeResult<Node<S::Payload>> {
        let path = self.codec.parse(raw_path)?;
        self.find(partition, &path)?.ok_or_else(|| {
            StorageError::RowNotFound(format!("no item at {} in {}", path, partition)).into()
        })
    }

    /// Memoized parent lookup.
    pub fn parent_of(&self, node: &mut Node<S::Payload>) -> TreeResult<Option<Node<S::Payload>>> {
        self.parents().parent_of(node, false)
    }

    /// Parent lookup that discards the memoized value first.
    pub fn parent_of_refreshed(&self, node: &mut Node<S::Payload>) -> TreeResult<Option<Node<S::Payload>>> {
        self.parents().parent_of(node, true)
    }

    pub fn ancestors(&self, node: &mut Node<S::Payload>) -> TreeResult<Vec<Node<S::Payload>>> {
        self.parents().ancestors(node)
    }

    /// Strict descendants of `node`, in path order.
    pub fn descendants(&self, node: &Node<S::Payload>) -> TreeResult<Vec<Node<S::Payload>>> {
        Ok(self
            .index()
            .subtree(node.partition, &node.path)?
            .into_iter()
            .filter(|n| n.id != node.id)
            .collect())
    }

    pub fn find_problems(&self, partition: PartitionId) -> TreeResult<ProblemReport> {
        TreeInspector::new(&self.store, &self.codec).find_problems(partition)
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    pub fn insert_child(
        &mut self,
        parent: Option<&Node<S::Payload>>,
        partition: PartitionId,
        payload: S::Payload,
    ) -> TreeResult<Node<S::Payload>> {
        self.mutator().insert_child(parent, partition, payload)
    }

    pub fn insert_relative(
        &mut self,
        target: &Node<S::Payload>,
        position: Position,
        payload: S::Payload,
    ) -> TreeResult<Node<S::Payload>> {
        self.mutator().insert_relative(target, position, payload)
    }

    pub fn move_node(
        &mut self,
        node: &Node<S::Payload>,
        target: &Node<S::Payload>,
        position: Position,
    ) -> TreeResult<()> {
        self.mutator().move_node(node, target, position)
    }

    pub fn delete_subtree(&mut self, node: &Node<S::Payload>) -> TreeResult<usize> {
        self.mutator().delete_subtree(node)
    }

    pub fn update_payload(
        &mut self,
        node: &Node<S::Payload>,
        payload: S::Payload,
    ) -> TreeResult<Node<S::Payload>> {
        self.mutator().update_payload(node, payload)
    }

    pub fn fix_tree(&mut self, partition: PartitionId) -> TreeResult<FixReport> {
        self.mutator().fix_tree(partition)
    }

    fn mutator(&mut self) -> TreeMutator<'_, S> {
        TreeMutator::new(&mut self.store, &self.codec, self.policy)
    }

    fn index(&self) -> PartitionIndex<'_, S> {
        PartitionIndex::new(&self.store, &self.codec)
    }

    fn siblings(&self) -> OrderedSiblingSet<'_, S> {
        OrderedSiblingSet::new(&self.store, &self.codec)
    }

    fn parents(&self) -> ParentResolver<'_, S> {
        ParentResolver::new(&self.store, &self.codec)
    }
}
