//! Read-only consistency checks of one partition

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::debug;

use crate::application::services::PartitionIndex;
use crate::application::TreeResult;
use crate::domain::{MaterializedPath, PartitionId, PathCodec};
use crate::infrastructure::NodeStore;

/// Invariant violations found in a partition, each listed by node path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemReport {
    /// Paths that do not decode with the configured codec.
    pub malformed_paths: Vec<MaterializedPath>,
    /// Stored depth disagrees with path length.
    pub wrong_depth: Vec<MaterializedPath>,
    /// Some ancestor prefix has no node.
    pub orphans: Vec<MaterializedPath>,
    /// Stored child count disagrees with the actual children.
    pub wrong_child_count: Vec<MaterializedPath>,
    /// Parent paths whose children share a sort weight.
    pub duplicate_weights: Vec<MaterializedPath>,
}

impl ProblemReport {
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.malformed_paths.len()
            + self.wrong_depth.len()
            + self.orphans.len()
            + self.wrong_child_count.len()
            + self.duplicate_weights.len()
    }
}

pub struct TreeInspector<'a, S> {
    store: &'a S,
    codec: &'a PathCodec,
}

impl<'a, S: NodeStore> TreeInspector<'a, S> {
    pub fn new(store: &'a S, codec: &'a PathCodec) -> Self {
        Self { store, codec }
    }

    pub fn find_problems(&self, partition: PartitionId) -> TreeResult<ProblemReport> {
        let index = PartitionIndex::new(self.store, self.codec);
        index.partition(partition)?;
        let nodes = index.all_nodes(partition)?;
        let mut report = ProblemReport::default();

        let present: HashSet<&MaterializedPath> = nodes.iter().map(|n| &n.path).collect();
        let mut child_counts: HashMap<MaterializedPath, usize> = HashMap::new();
        let mut weights: Vec<(MaterializedPath, u32)> = Vec::new();

        for node in &nodes {
            if self.codec.decode(&node.path).is_err() || node.path.is_root() {
                report.malformed_paths.push(node.path.clone());
                continue;
            }
            let group = self.codec.group_path_of(&node.path)?;
            *child_counts.entry(group.clone()).or_default() += 1;
            weights.push((group, node.sort_weight));

            if self.codec.depth_of(&node.path)? != node.depth {
                report.wrong_depth.push(node.path.clone());
            }
            if self
                .codec
                .ancestor_paths(&node.path)?
                .iter()
                .any(|ancestor| !present.contains(ancestor))
            {
                report.orphans.push(node.path.clone());
            }
        }

        for node in &nodes {
            let actual = child_counts.get(&node.path).copied().unwrap_or(0);
            if actual != node.child_count {
                report.wrong_child_count.push(node.path.clone());
            }
        }

        report.duplicate_weights = weights
            .into_iter()
            .into_group_map()
            .into_iter()
            .filter(|(_, group_weights)| {
                group_weights
                    .iter()
                    .sorted()
                    .tuple_windows()
                    .any(|(a, b)| a == b)
            })
            .map(|(group, _)| group)
            .sorted()
            .collect();

        debug!("find_problems: {} in {}", report.total(), partition);
        Ok(report)
    }
}
