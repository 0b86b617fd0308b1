//! Domain entities: core data structures

use std::fmt;

use generational_arena::Index;
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::parent_cache::ParentCache;
use crate::domain::path::MaterializedPath;

/// Stable handle of a node. Stale handles never resolve to a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl NodeId {
    pub fn from_index(index: Index) -> Self {
        Self(index)
    }

    pub fn index(&self) -> Index {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "node#{}.{}", slot, generation)
    }
}

/// Handle of a partition (a menu).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionId(Index);

impl PartitionId {
    pub fn from_index(index: Index) -> Self {
        Self(index)
    }

    pub fn index(&self) -> Index {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "menu#{}.{}", slot, generation)
    }
}

/// Longest accepted partition identifier.
pub const MAX_IDENTIFIER_LEN: usize = 16;
/// Longest accepted partition name.
pub const MAX_NAME_LEN: usize = 64;

/// Stored columns of a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    pub identifier: String,
    pub name: String,
    pub group: Option<String>,
}

impl PartitionRecord {
    /// Validate identifier and name lengths.
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        group: Option<String>,
    ) -> DomainResult<Self> {
        let identifier = identifier.into();
        let name = name.into();
        if identifier.is_empty()
            || identifier.chars().count() > MAX_IDENTIFIER_LEN
            || identifier.chars().any(char::is_whitespace)
        {
            return Err(DomainError::InvalidIdentifier(identifier));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::InvalidEntry {
                field: "name",
                reason: format!("longer than {} characters", MAX_NAME_LEN),
            });
        }
        Ok(Self {
            identifier,
            name,
            group,
        })
    }
}

/// An independent tree namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub id: PartitionId,
    pub identifier: String,
    pub name: String,
    pub group: Option<String>,
}

impl Partition {
    pub fn from_record(id: PartitionId, record: PartitionRecord) -> Self {
        Self {
            id,
            identifier: record.identifier,
            name: record.name,
            group: record.group,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Stored columns of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord<P> {
    pub partition: PartitionId,
    pub path: MaterializedPath,
    pub depth: usize,
    pub child_count: usize,
    pub sort_weight: u32,
    pub payload: P,
}

/// A tree element as read from the store.
///
/// Nodes are snapshots: mutating operations re-read them by id, and the
/// copy held by a caller goes stale once the tree changes.
#[derive(Debug, Clone)]
pub struct Node<P> {
    pub id: NodeId,
    pub partition: PartitionId,
    pub path: MaterializedPath,
    pub depth: usize,
    pub child_count: usize,
    pub sort_weight: u32,
    pub payload: P,
    /// Memoized parent lookup, see [`crate::application::services::ParentResolver`].
    pub parent: ParentCache<P>,
}

impl<P> Node<P> {
    pub fn from_record(id: NodeId, record: NodeRecord<P>) -> Self {
        Self {
            id,
            partition: record.partition,
            path: record.path,
            depth: record.depth,
            child_count: record.child_count,
            sort_weight: record.sort_weight,
            payload: record.payload,
            parent: ParentCache::default(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.child_count == 0
    }
}

impl<P: fmt::Display> fmt::Display for Node<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload)
    }
}

/// Where a moved or inserted node lands relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// Immediately left of the target, same parent.
    Before,
    /// Immediately right of the target, same parent.
    After,
    /// Child of the target. Lands after the existing children, exactly
    /// like `LastChild`.
    FirstChild,
    /// Child of the target, after its existing children.
    LastChild,
}

impl Position {
    pub fn is_sibling(&self) -> bool {
        matches!(self, Position::Before | Position::After)
    }
}

/// How a menu link opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkTarget {
    #[default]
    SameWindow,
    NewWindow,
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTarget::SameWindow => write!(f, "same window"),
            LinkTarget::NewWindow => write!(f, "new window"),
        }
    }
}

/// Longest accepted menu entry title.
pub const MAX_TITLE_LEN: usize = 64;
/// Longest accepted menu entry link.
pub const MAX_LINK_LEN: usize = 256;

/// Default payload: one entry of a navigation menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub target: LinkTarget,
}

impl MenuEntry {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        target: LinkTarget,
    ) -> DomainResult<Self> {
        let entry = Self {
            title: title.into(),
            link: link.into(),
            target,
        };
        entry.validate()?;
        Ok(entry)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::InvalidEntry {
                field: "title",
                reason: "must not be empty".into(),
            });
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::InvalidEntry {
                field: "title",
                reason: format!("longer than {} characters", MAX_TITLE_LEN),
            });
        }
        if self.link.chars().count() > MAX_LINK_LEN {
            return Err(DomainError::InvalidEntry {
                field: "link",
                reason: format!("longer than {} characters", MAX_LINK_LEN),
            });
        }
        Ok(())
    }
}

impl fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
