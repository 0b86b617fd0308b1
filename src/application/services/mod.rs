//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the storage boundary trait (`NodeStore`) but are
//! themselves concrete structs, not traits.

mod inspector;
mod menu_tree;
mod mutator;
mod parents;
mod partition_index;
mod siblings;

pub use inspector::{ProblemReport, TreeInspector};
pub use menu_tree::MenuTree;
pub use mutator::{CrossPartitionPolicy, FixReport, TreeMutator};
pub use parents::ParentResolver;
pub use partition_index::PartitionIndex;
pub use siblings::OrderedSiblingSet;
