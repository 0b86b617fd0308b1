//! Atomic tree mutations
//!
//! Each public operation runs inside one store transaction: either every
//! path, depth, child count and weight change commits, or none does.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::application::services::{OrderedSiblingSet, ParentResolver, PartitionIndex};
use crate::application::{TreeError, TreeResult};
use crate::domain::{DomainError, MaterializedPath, Node, NodeId, NodeRecord, PartitionId, PathCodec, Position};
use crate::infrastructure::{NodeFilter, NodeStore, NodeUpdate, StorageError};

/// What to do when a move names a target in another partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossPartitionPolicy {
    /// Fail with [`TreeError::CrossPartitionMove`].
    #[default]
    Reject,
    /// Treat the move as a move onto the node itself: nothing changes.
    Ignore,
}

/// Counters of a [`TreeMutator::fix_tree`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixReport {
    pub depths_fixed: usize,
    pub child_counts_fixed: usize,
    pub weights_renumbered: usize,
}

impl FixReport {
    pub fn is_noop(&self) -> bool {
        self.depths_fixed == 0 && self.child_counts_fixed == 0 && self.weights_renumbered == 0
    }
}

/// Where a node lands inside its sibling group.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Back,
    Before(NodeId),
    After(NodeId),
}

/// Orchestrates inserts, moves and deletes over a [`NodeStore`].
pub struct TreeMutator<'a, S: NodeStore> {
    store: &'a mut S,
    codec: &'a PathCodec,
    policy: CrossPartitionPolicy,
}

impl<'a, S: NodeStore> TreeMutator<'a, S> {
    pub fn new(store: &'a mut S, codec: &'a PathCodec, policy: CrossPartitionPolicy) -> Self {
        Self {
            store,
            codec,
            policy,
        }
    }

    /// Create `payload` as the last child of `parent`, or as the last root
    /// node of `partition` when `parent` is `None`.
    #[instrument(level = "debug", skip_all, fields(parent = ?parent.map(|p| p.id), %partition))]
    pub fn insert_child(
        &mut self,
        parent: Option<&Node<S::Payload>>,
        partition: PartitionId,
        payload: S::Payload,
    ) -> TreeResult<Node<S::Payload>> {
        let parent_id = parent.map(|p| p.id);
        self.atomic("insert_child", move |m| {
            m.index().partition(partition)?;
            let parent = parent_id.map(|id| m.fetch(id)).transpose()?;
            if let Some(parent) = &parent {
                m.index().ensure_member(parent, partition)?;
            }
            let id = m.append_child(partition, parent.as_ref(), payload)?;
            m.fetch(id)
        })
    }

    /// Create `payload` next to `target` (sibling positions) or below it
    /// (child positions).
    #[instrument(level = "debug", skip_all, fields(target = %target.id, ?position))]
    pub fn insert_relative(
        &mut self,
        target: &Node<S::Payload>,
        position: Position,
        payload: S::Payload,
    ) -> TreeResult<Node<S::Payload>> {
        let target_id = target.id;
        self.atomic("insert_relative", move |m| {
            let target = m.fetch(target_id)?;
            let partition = target.partition;
            let (group, parent) = m.destination(&target, position)?;
            let id = m.append_child(partition, parent.as_ref(), payload)?;
            m.reorder(partition, &group, id, Self::anchor_for(position, target_id))?;
            m.fetch(id)
        })
    }

    /// Move `node` (and its subtree) relative to `target`.
    ///
    /// Reparenting allocates a fresh path below the new parent and rewrites
    /// the whole subtree; reordering within the same parent keeps paths.
    #[instrument(level = "debug", skip_all, fields(node = %node.id, target = %target.id, ?position))]
    pub fn move_node(
        &mut self,
        node: &Node<S::Payload>,
        target: &Node<S::Payload>,
        position: Position,
    ) -> TreeResult<()> {
        let (node_id, target_id) = (node.id, target.id);
        self.atomic("move", move |m| m.move_inner(node_id, target_id, position))
    }

    /// Delete `node` and every descendant. Returns the number of removed nodes.
    #[instrument(level = "debug", skip_all, fields(node = %node.id))]
    pub fn delete_subtree(&mut self, node: &Node<S::Payload>) -> TreeResult<usize> {
        let node_id = node.id;
        self.atomic("delete_subtree", move |m| {
            let mut node = m.fetch(node_id)?;
            let partition = node.partition;
            let parent = m.parents().parent_of(&mut node, true)?;
            let group = m.codec.group_path_of(&node.path)?;

            let removed = m
                .store
                .delete_nodes(&NodeFilter::subtree_of(partition, node.path.clone()))?;
            if let Some(parent) = parent {
                m.adjust_child_count(parent.id, -1)?;
            }
            m.renumber_group(partition, &group)?;
            debug!("delete_subtree: removed {} nodes below {}", removed, group);
            Ok(removed)
        })
    }

    /// Replace the payload of `node`; structure is untouched.
    #[instrument(level = "debug", skip_all, fields(node = %node.id))]
    pub fn update_payload(
        &mut self,
        node: &Node<S::Payload>,
        payload: S::Payload,
    ) -> TreeResult<Node<S::Payload>> {
        let node_id = node.id;
        self.atomic("update_payload", move |m| {
            m.fetch(node_id)?;
            m.store.update_node(node_id, NodeUpdate::payload(payload))?;
            m.fetch(node_id)
        })
    }

    /// Recompute depths and child counts of `partition` and renumber every
    /// sibling group in its current order.
    #[instrument(level = "debug", skip_all, fields(%partition))]
    pub fn fix_tree(&mut self, partition: PartitionId) -> TreeResult<FixReport> {
        self.atomic("fix_tree", move |m| {
            m.index().partition(partition)?;
            let mut report = FixReport::default();
            let nodes = m.index().all_nodes(partition)?;

            let mut child_counts: HashMap<MaterializedPath, usize> = HashMap::new();
            let mut groups = BTreeSet::new();
            for node in &nodes {
                let group = m.codec.group_path_of(&node.path)?;
                *child_counts.entry(group.clone()).or_default() += 1;
                groups.insert(group);
            }

            for node in &nodes {
                let depth = m.codec.depth_of(&node.path)?;
                if depth != node.depth {
                    m.store.update_node(
                        node.id,
                        NodeUpdate {
                            depth: Some(depth),
                            ..NodeUpdate::default()
                        },
                    )?;
                    report.depths_fixed += 1;
                }
                let actual = child_counts.get(&node.path).copied().unwrap_or(0);
                if actual != node.child_count {
                    m.store.update_node(node.id, NodeUpdate::child_count(actual))?;
                    report.child_counts_fixed += 1;
                }
            }

            for group in &groups {
                let mut siblings = m.siblings().children_at(partition, group)?;
                report.weights_renumbered += OrderedSiblingSet::renumber(&mut *m.store, &mut siblings)?;
            }
            debug!("fix_tree: {:?}", report);
            Ok(report)
        })
    }

    fn move_inner(&mut self, node_id: NodeId, target_id: NodeId, position: Position) -> TreeResult<()> {
        let mut node = self.fetch(node_id)?;
        let target = self.fetch(target_id)?;

        if node.partition != target.partition {
            match self.policy {
                CrossPartitionPolicy::Reject => {
                    return Err(TreeError::CrossPartitionMove {
                        node: node.id,
                        from: node.partition,
                        to: target.partition,
                    })
                }
                CrossPartitionPolicy::Ignore => {
                    warn!("move: {} targets another partition, ignored", node.id);
                    return Ok(());
                }
            }
        }
        if node.id == target.id {
            debug!("move: {} onto itself, nothing to do", node.id);
            return Ok(());
        }

        let partition = node.partition;
        let (new_group, new_parent) = self.destination(&target, position)?;
        if new_group.starts_with(&node.path) {
            return Err(TreeError::InvalidMoveToDescendant {
                node: node.id,
                target: target.id,
            });
        }

        let original_parent = self.parents().parent_of(&mut node, true)?;
        let old_group = self.codec.group_path_of(&node.path)?;
        let reparent = old_group != new_group;

        if reparent {
            let new_path = self.index().next_child_path(partition, &new_group)?;
            let relocated = self.relocate_subtree(partition, &node.path, &new_path)?;
            debug!("move: {} -> {} ({} nodes relocated)", node.path, new_path, relocated);

            let weight = self.append_weight(partition, &new_group, Some(node.id))?;
            self.store.update_node(node.id, NodeUpdate::sort_weight(weight))?;

            if let Some(old_parent) = &original_parent {
                self.adjust_child_count(old_parent.id, -1)?;
            }
            if let Some(new_parent) = &new_parent {
                self.adjust_child_count(new_parent.id, 1)?;
            }
        }

        self.reorder(partition, &new_group, node.id, Self::anchor_for(position, target.id))?;

        if reparent {
            self.renumber_group(partition, &old_group)?;
        }
        Ok(())
    }

    /// Group path and parent node a `position` relative to `target` lands in.
    fn destination(
        &self,
        target: &Node<S::Payload>,
        position: Position,
    ) -> TreeResult<(MaterializedPath, Option<Node<S::Payload>>)> {
        if !position.is_sibling() {
            return Ok((target.path.clone(), Some(target.clone())));
        }
        match self.codec.parent_path_of(&target.path)? {
            None => Ok((MaterializedPath::root(), None)),
            Some(parent_path) => {
                let parent = self
                    .index()
                    .find(target.partition, &parent_path)?
                    .ok_or_else(|| StorageError::RowNotFound(format!("parent {} of {}", parent_path, target.id)))?;
                Ok((parent_path, Some(parent)))
            }
        }
    }

    fn anchor_for(position: Position, target: NodeId) -> Anchor {
        match position {
            Position::Before => Anchor::Before(target),
            Position::After => Anchor::After(target),
            // both child positions append after the target's current children
            Position::FirstChild | Position::LastChild => Anchor::Back,
        }
    }

    /// Insert a row as the last child of `parent` (root level if `None`).
    fn append_child(
        &mut self,
        partition: PartitionId,
        parent: Option<&Node<S::Payload>>,
        payload: S::Payload,
    ) -> TreeResult<NodeId> {
        let group = parent.map(|p| p.path.clone()).unwrap_or_else(MaterializedPath::root);
        let path = self.index().next_child_path(partition, &group)?;
        let depth = self.codec.depth_of(&path)?;
        let sort_weight = self.append_weight(partition, &group, None)?;

        let id = self.store.insert_node(NodeRecord {
            partition,
            path: path.clone(),
            depth,
            child_count: 0,
            sort_weight,
            payload,
        })?;
        if let Some(parent) = parent {
            self.adjust_child_count(parent.id, 1)?;
        }
        debug!("append_child: {} at {} weight {}", id, path, sort_weight);
        Ok(id)
    }

    /// Weight that sorts after every child of `group` except `excluding`.
    fn append_weight(
        &mut self,
        partition: PartitionId,
        group: &MaterializedPath,
        excluding: Option<NodeId>,
    ) -> TreeResult<u32> {
        let mut others: Vec<_> = self
            .siblings()
            .children_at(partition, group)?
            .into_iter()
            .filter(|n| Some(n.id) != excluding)
            .collect();
        match others.last().map(|n| n.sort_weight.checked_add(1)) {
            None => Ok(0),
            Some(Some(weight)) => Ok(weight),
            Some(None) => {
                OrderedSiblingSet::renumber(&mut *self.store, &mut others)?;
                Ok(others.len() as u32)
            }
        }
    }

    /// Place `node_id` at `anchor` within `group` and renumber the group.
    fn reorder(
        &mut self,
        partition: PartitionId,
        group: &MaterializedPath,
        node_id: NodeId,
        anchor: Anchor,
    ) -> TreeResult<()> {
        let mut siblings = self.siblings().children_at(partition, group)?;
        let from = siblings
            .iter()
            .position(|n| n.id == node_id)
            .ok_or(TreeError::TargetNotFound(node_id))?;
        let node = siblings.remove(from);

        let index_of = |siblings: &[Node<S::Payload>], id: NodeId| {
            siblings
                .iter()
                .position(|n| n.id == id)
                .ok_or(TreeError::TargetNotFound(id))
        };
        let at = match anchor {
            Anchor::Back => siblings.len(),
            Anchor::Before(target) => index_of(&siblings, target)?,
            Anchor::After(target) => index_of(&siblings, target)? + 1,
        };
        siblings.insert(at, node);
        OrderedSiblingSet::renumber(&mut *self.store, &mut siblings)?;
        Ok(())
    }

    fn renumber_group(&mut self, partition: PartitionId, group: &MaterializedPath) -> TreeResult<usize> {
        let mut siblings = self.siblings().children_at(partition, group)?;
        OrderedSiblingSet::renumber(&mut *self.store, &mut siblings)
    }

    /// Rewrite the path prefix `old` to `new` for a node and all its descendants.
    fn relocate_subtree(
        &mut self,
        partition: PartitionId,
        old: &MaterializedPath,
        new: &MaterializedPath,
    ) -> TreeResult<usize> {
        let subtree = self.index().subtree(partition, old)?;
        for member in &subtree {
            let path = member.path.rebase(old, new).ok_or_else(|| DomainError::MalformedPath {
                path: member.path.to_string(),
                reason: format!("not below {}", old),
            })?;
            let depth = self.codec.depth_of(&path)?;
            self.store.update_node(member.id, NodeUpdate::relocate(path, depth))?;
        }
        Ok(subtree.len())
    }

    fn adjust_child_count(&mut self, id: NodeId, delta: i64) -> TreeResult<()> {
        let node = self.fetch(id)?;
        let count = node.child_count as i64 + delta;
        if count < 0 {
            warn!("{} at {} has child_count {}, cannot apply {}", id, node.path, node.child_count, delta);
            return Err(TreeError::ChildCountUnderflow {
                node: id,
                path: node.path.to_string(),
            });
        }
        self.store.update_node(id, NodeUpdate::child_count(count as usize))?;
        Ok(())
    }

    fn fetch(&self, id: NodeId) -> TreeResult<Node<S::Payload>> {
        self.store.node(id)?.ok_or(TreeError::TargetNotFound(id))
    }

    fn index(&self) -> PartitionIndex<'_, S> {
        PartitionIndex::new(&*self.store, self.codec)
    }

    fn siblings(&self) -> OrderedSiblingSet<'_, S> {
        OrderedSiblingSet::new(&*self.store, self.codec)
    }

    fn parents(&self) -> ParentResolver<'_, S> {
        ParentResolver::new(&*self.store, self.codec)
    }

    /// Run `op` inside a transaction; roll back on any error.
    fn atomic<T>(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&mut Self) -> TreeResult<T>,
    ) -> TreeResult<T> {
        self.store.begin()?;
        match op(self) {
            Ok(value) => {
                self.store.commit()?;
                debug!("{}: committed", operation);
                Ok(value)
            }
            Err(e) => {
                debug!("{}: rolling back: {}", operation, e);
                if let Err(rollback) = self.store.rollback() {
                    warn!("{}: rollback failed: {}", operation, rollback);
                }
                Err(e)
            }
        }
    }
}
