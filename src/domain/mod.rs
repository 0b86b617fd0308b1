//! Domain layer: entities, paths and pure tree rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod parent_cache;
pub mod path;

pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use parent_cache::ParentCache;
pub use path::{MaterializedPath, PathCodec, DEFAULT_ALPHABET, DEFAULT_STEP_LENGTH};
