//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/menutree/menutree.toml`
//! 3. Local config: an explicit file (CLI `--config`)
//! 4. Environment variables: `MENUTREE_*` prefix, `__` between nested keys

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::{CrossPartitionPolicy, TreeError};
use crate::domain::{PathCodec, DEFAULT_ALPHABET, DEFAULT_STEP_LENGTH};

/// Path encoding and move policy of the tree engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeConfig {
    /// Characters per path segment
    pub step_length: usize,
    /// Segment digits, lowest first
    pub alphabet: String,
    /// Behaviour of moves whose target lives in another menu
    pub cross_partition_moves: CrossPartitionPolicy,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            step_length: DEFAULT_STEP_LENGTH,
            alphabet: DEFAULT_ALPHABET.to_string(),
            cross_partition_moves: CrossPartitionPolicy::default(),
        }
    }
}

impl TreeConfig {
    /// Build the validated path codec for this configuration.
    pub fn codec(&self) -> Result<PathCodec, TreeError> {
        Ok(PathCodec::new(self.step_length, &self.alphabet)?)
    }
}

/// Raw tree settings for intermediate parsing (`None` = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawTreeConfig {
    pub step_length: Option<usize>,
    pub alphabet: Option<String>,
    pub cross_partition_moves: Option<CrossPartitionPolicy>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store_path: Option<PathBuf>,
    pub tree: RawTreeConfig,
}

/// Unified configuration for menutree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Snapshot file holding all menus
    pub store_path: PathBuf,
    /// Tree engine settings
    pub tree: TreeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            tree: TreeConfig::default(),
        }
    }
}

/// Get the default snapshot location (XDG data dir).
fn default_store_path() -> PathBuf {
    ProjectDirs::from("", "", "menutree")
        .map(|dirs| dirs.data_dir().join("menutree.toml"))
        .unwrap_or_else(|| PathBuf::from("menutree.toml"))
}

/// Get the XDG config directory for menutree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "menutree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("menutree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, TreeError> {
    let content = std::fs::read_to_string(path).map_err(|e| TreeError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| TreeError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> TreeError {
    TreeError::Config {
        message: e.to_string(),
    }
}

fn parse_policy(raw: &str) -> Result<CrossPartitionPolicy, TreeError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "reject" => Ok(CrossPartitionPolicy::Reject),
        "ignore" => Ok(CrossPartitionPolicy::Ignore),
        other => Err(TreeError::Config {
            message: format!("cross_partition_moves must be reject or ignore, got {:?}", other),
        }),
    }
}

impl Settings {
    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store_path: overlay
                .store_path
                .clone()
                .unwrap_or_else(|| self.store_path.clone()),
            tree: TreeConfig {
                step_length: overlay.tree.step_length.unwrap_or(self.tree.step_length),
                alphabet: overlay
                    .tree
                    .alphabet
                    .clone()
                    .unwrap_or_else(|| self.tree.alphabet.clone()),
                cross_partition_moves: overlay
                    .tree
                    .cross_partition_moves
                    .unwrap_or(self.tree.cross_partition_moves),
            },
        }
    }

    /// Expand `~` and `$VAR` in the store path.
    fn expand_paths(&mut self) {
        let raw = self.store_path.to_string_lossy().to_string();
        let expanded = shellexpand::full(&raw)
            .map(|s| s.into_owned())
            .unwrap_or(raw);
        self.store_path = PathBuf::from(expanded);
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional explicit config file; it must exist if given
    pub fn load(local: Option<&Path>) -> Result<Self, TreeError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        if let Some(local_path) = local {
            let raw = load_raw_settings(local_path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.tree.codec()?;

        Ok(current)
    }

    /// Apply MENUTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, TreeError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MENUTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store_path") {
            settings.store_path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_int("tree.step_length") {
            settings.tree.step_length = usize::try_from(val).map_err(|_| TreeError::Config {
                message: format!("tree.step_length must be positive, got {}", val),
            })?;
        }
        if let Ok(val) = config.get_string("tree.alphabet") {
            settings.tree.alphabet = val;
        }
        if let Ok(val) = config.get_string("tree.cross_partition_moves") {
            settings.tree.cross_partition_moves = parse_policy(&val)?;
        }

        Ok(settings)
    }

    /// Render as TOML, for display.
    pub fn to_toml(&self) -> Result<String, TreeError> {
        toml::to_string_pretty(self).map_err(|e| TreeError::Config {
            message: format!("serialize settings: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build_codec() {
        let settings = Settings::default();
        let codec = settings.tree.codec().unwrap();
        assert_eq!(codec.step_length(), 4);
        assert_eq!(settings.tree.cross_partition_moves, CrossPartitionPolicy::Reject);
    }

    #[test]
    fn test_merge_overlay_wins_when_specified() {
        let base = Settings::default();
        let overlay: RawSettings = toml::from_str(
            r#"
[tree]
step_length = 2
cross_partition_moves = "ignore"
"#,
        )
        .unwrap();
        let merged = base.merge_with(&overlay);
        assert_eq!(merged.tree.step_length, 2);
        assert_eq!(merged.tree.alphabet, DEFAULT_ALPHABET);
        assert_eq!(merged.tree.cross_partition_moves, CrossPartitionPolicy::Ignore);
        assert_eq!(merged.store_path, base.store_path);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(parse_policy("Reject").unwrap(), CrossPartitionPolicy::Reject);
        assert_eq!(parse_policy("ignore").unwrap(), CrossPartitionPolicy::Ignore);
        assert!(parse_policy("fail").is_err());
    }
}
