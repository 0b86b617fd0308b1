//! Infrastructure layer: the backing store boundary and its implementations
//!
//! This layer defines what the tree engine consumes from storage and
//! provides an in-memory transactional store plus file persistence.

pub mod error;
pub mod error_ext;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use error_ext::IoResultExt;
pub use memory::MemoryStore;
pub use snapshot::{ItemSnapshot, MenuSnapshot, SnapshotDocument, SnapshotFile};
pub use traits::{NodeFilter, NodeStore, NodeUpdate, PathMatch, ScanOrder};
