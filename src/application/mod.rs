//! Application layer: the tree engine
//!
//! This layer orchestrates domain logic and depends on the storage boundary trait.

pub mod error;
pub mod services;

pub use error::{TreeError, TreeResult};
pub use services::{
    CrossPartitionPolicy, FixReport, MenuTree, OrderedSiblingSet, ParentResolver,
    PartitionIndex, ProblemReport, TreeInspector, TreeMutator,
};
