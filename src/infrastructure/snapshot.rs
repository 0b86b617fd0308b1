//! TOML snapshot persistence for menu stores
//!
//! ```toml
//! [[menus]]
//! identifier = "main"
//! name = "Main navigation"
//!
//! [[menus.items]]
//! path = "0001"
//! sort_weight = 0
//! title = "Home"
//! link = "/"
//! target = "same-window"
//! ```
//!
//! Only authoritative columns are written; depth and child counts are
//! derived from the paths on load. Every item's parent path must be present
//! in the same menu.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::{
    LinkTarget, MaterializedPath, MenuEntry, NodeRecord, PartitionRecord, PathCodec,
};
use crate::infrastructure::error::{StorageError, StorageResult};
use crate::infrastructure::error_ext::IoResultExt;
use crate::infrastructure::memory::MemoryStore;
use crate::infrastructure::traits::{NodeFilter, NodeStore, ScanOrder};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub menus: Vec<MenuSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuSnapshot {
    pub identifier: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub path: MaterializedPath,
    pub sort_weight: u32,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub target: LinkTarget,
}

/// A menu store persisted as one TOML file.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store; a missing file yields an empty store.
    pub fn load(&self, codec: &PathCodec) -> StorageResult<MemoryStore<MenuEntry>> {
        if !self.path.exists() {
            debug!("load: {} does not exist, starting empty", self.path.display());
            return Ok(MemoryStore::new());
        }
        let content = std::fs::read_to_string(&self.path).with_path_context("read snapshot", &self.path)?;
        let document: SnapshotDocument = toml::from_str(&content).map_err(|e| self.format_err(e))?;
        let store = self.restore(&document, codec)?;
        debug!("load: {} nodes from {}", store.node_count(), self.path.display());
        Ok(store)
    }

    /// Write the store atomically (temp file in the same directory, then rename).
    pub fn save(&self, store: &MemoryStore<MenuEntry>) -> StorageResult<()> {
        let document = Self::capture(store)?;
        let content = toml::to_string_pretty(&document).map_err(|e| self.format_err(e))?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).with_path_context("create snapshot directory", &dir)?;
        let mut tmp = NamedTempFile::new_in(&dir).with_path_context("create temp file", &dir)?;
        tmp.write_all(content.as_bytes())
            .with_path_context("write snapshot", tmp.path())?;
        tmp.persist(&self.path)
            .map_err(|e| StorageError::io(format!("replace snapshot: {}", self.path.display()), e.error))?;
        debug!("save: wrote {}", self.path.display());
        Ok(())
    }

    /// Snapshot of every menu, nodes in path order.
    pub fn capture(store: &MemoryStore<MenuEntry>) -> StorageResult<SnapshotDocument> {
        let mut partitions = store.partitions()?;
        partitions.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        let mut menus = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let items = store
                .scan(&NodeFilter::all(partition.id), ScanOrder::Path)?
                .into_iter()
                .map(|node| ItemSnapshot {
                    path: node.path,
                    sort_weight: node.sort_weight,
                    title: node.payload.title,
                    link: node.payload.link,
                    target: node.payload.target,
                })
                .collect();
            menus.push(MenuSnapshot {
                identifier: partition.identifier,
                name: partition.name,
                group: partition.group,
                items,
            });
        }
        Ok(SnapshotDocument { menus })
    }

    fn restore(&self, document: &SnapshotDocument, codec: &PathCodec) -> StorageResult<MemoryStore<MenuEntry>> {
        let mut store = MemoryStore::new();
        for menu in &document.menus {
            let record = PartitionRecord::new(&menu.identifier, &menu.name, menu.group.clone())
                .map_err(|e| self.format_err(e))?;
            let partition = store.insert_partition(record)?;

            let paths: HashSet<&MaterializedPath> = menu.items.iter().map(|item| &item.path).collect();
            let mut child_counts: HashMap<MaterializedPath, usize> = HashMap::new();
            for item in &menu.items {
                if let Some(parent) = codec.parent_path_of(&item.path).map_err(|e| self.format_err(e))? {
                    if !paths.contains(&parent) {
                        return Err(self.format_err(format!(
                            "item {} in menu {} has no parent item {}",
                            item.path, menu.identifier, parent
                        )));
                    }
                }
                let parent = codec.group_path_of(&item.path).map_err(|e| self.format_err(e))?;
                *child_counts.entry(parent).or_default() += 1;
            }

            for item in &menu.items {
                let depth = codec.depth_of(&item.path).map_err(|e| self.format_err(e))?;
                if depth == 0 {
                    return Err(self.format_err(format!("empty item path in menu {}", menu.identifier)));
                }
                codec.decode(&item.path).map_err(|e| self.format_err(e))?;
                let payload = MenuEntry::new(&item.title, &item.link, item.target)
                    .map_err(|e| self.format_err(e))?;
                store.insert_node(NodeRecord {
                    partition,
                    path: item.path.clone(),
                    depth,
                    child_count: child_counts.get(&item.path).copied().unwrap_or(0),
                    sort_weight: item.sort_weight,
                    payload,
                })?;
            }
        }
        Ok(store)
    }

    fn format_err(&self, e: impl std::fmt::Display) -> StorageError {
        StorageError::Format {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}
