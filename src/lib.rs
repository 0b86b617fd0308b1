//! menutree: partitioned, ordered trees stored as materialized paths.
//!
//! Every node belongs to exactly one partition (a menu) and carries a
//! fixed-width path that encodes its ancestry. Siblings are ordered by a
//! dense sort weight. [`application::MenuTree`] is the entry point; it runs
//! over any [`infrastructure::NodeStore`].

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::{CrossPartitionPolicy, MenuTree, TreeError, TreeResult};
pub use domain::{MaterializedPath, MenuEntry, Node, NodeId, Partition, PartitionId, PathCodec, Position};
pub use infrastructure::{MemoryStore, NodeStore, SnapshotFile};
