// Engine configuration.
//
// Global config: `~/.folio/config.toml`
// Store config:  `<store_root>/.folio/config.toml` (overrides global keys)
//
// The loaded value is immutable and passed explicitly into each component.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::merge::MergeStrategy;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.70;
pub const DEFAULT_AUTHOR: &str = "folio";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Root directory for folio global state: `~/.folio/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".folio"))
}

/// Path to the global config file: `~/.folio/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the per-store config file: `<root>/.folio/config.toml`.
pub fn store_config_path(store_root: &Path) -> PathBuf {
    store_root.join(".folio").join("config.toml")
}

// ── Deduplication thresholds ───────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DedupConfig {
    /// Best score at or above this updates the candidate in place.
    pub similarity_threshold: f64,
    /// Best score at or above this (and below `similarity_threshold`) merges.
    pub merge_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
        }
    }
}

impl DedupConfig {
    pub fn new(similarity_threshold: f64, merge_threshold: f64) -> Self {
        Self { similarity_threshold, merge_threshold }
    }

    /// Both thresholds in (0, 1) and `similarity_threshold > merge_threshold`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("merge_threshold", self.merge_threshold),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigurationError::ThresholdOutOfRange { name, value });
            }
        }
        if self.similarity_threshold <= self.merge_threshold {
            return Err(ConfigurationError::ThresholdOrder {
                similarity: self.similarity_threshold,
                merge: self.merge_threshold,
            });
        }
        Ok(())
    }
}

// ── Merge strategies per decision ──────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Strategy applied when the gate decides UPDATE.
    pub update_strategy: MergeStrategy,
    /// Strategy applied when the gate decides MERGE.
    pub merge_strategy: MergeStrategy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { update_strategy: MergeStrategy::Integrate, merge_strategy: MergeStrategy::Integrate }
    }
}

// ── Engine config ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory holding documents and `.folio/` state. Not read from files.
    #[serde(skip)]
    pub store_root: PathBuf,
    /// Author recorded on every revision.
    pub author: String,
    /// Default `max_count` for history listings.
    pub history_limit: usize,
    pub dedup: DedupConfig,
    pub merge: MergeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("."),
            author: DEFAULT_AUTHOR.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            dedup: DedupConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults rooted at `store_root`.
    pub fn for_root(store_root: impl Into<PathBuf>) -> Self {
        Self { store_root: store_root.into(), ..Self::default() }
    }

    /// Load the global file, then the store file on top of it. Missing files
    /// are skipped; malformed files and invalid thresholds are errors.
    pub fn load(store_root: impl Into<PathBuf>) -> Result<Self, ConfigurationError> {
        let store_root = store_root.into();
        let mut layers = Vec::new();
        if let Some(global) = global_config_path() {
            layers.push(global);
        }
        layers.push(store_config_path(&store_root));
        Self::load_layers(store_root, &layers)
    }

    /// Load from explicit files, later files overriding earlier ones key by key.
    pub fn load_layers(
        store_root: impl Into<PathBuf>,
        layers: &[PathBuf],
    ) -> Result<Self, ConfigurationError> {
        let mut merged = toml::Table::new();
        for path in layers {
            if !path.exists() {
                continue;
            }
            let contents = std::fs::read_to_string(path)
                .map_err(|source| ConfigurationError::Io { path: path.clone(), source })?;
            let table: toml::Table = toml::from_str(&contents)
                .map_err(|source| ConfigurationError::Parse { path: path.clone(), source })?;
            merge_tables(&mut merged, table);
        }

        let origin = layers.last().cloned().unwrap_or_default();
        let mut config: Self = toml::Value::Table(merged)
            .try_into()
            .map_err(|source| ConfigurationError::Parse { path: origin, source })?;
        config.store_root = store_root.into();
        config.dedup.validate()?;
        Ok(config)
    }

    /// Write the file-backed settings to `path` (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigurationError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigurationError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|source| ConfigurationError::Io { path: path.to_path_buf(), source })
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
