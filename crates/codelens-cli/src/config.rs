//! On-disk configuration (§6): every numeric default from the spec's
//! configuration table as a named, overridable field instead of a bare
//! literal, following the teacher's `.arbor/config.json` convention in
//! `init`.

use codelens_indexer::IndexerConfig;
use codelens_watcher::WatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodelensConfig {
    pub max_concurrency: usize,
    pub per_file_timeout_ms: u64,
    pub debounce_ms: u64,
    pub exclude: Vec<String>,
}

impl Default for CodelensConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            per_file_timeout_ms: 30_000,
            debounce_ms: 100,
            exclude: Vec::new(),
        }
    }
}

impl CodelensConfig {
    pub fn dir(root: &Path) -> PathBuf {
        root.join(".codelens")
    }

    pub fn config_path(root: &Path) -> PathBuf {
        Self::dir(root).join("config.json")
    }

    pub fn db_path(root: &Path) -> PathBuf {
        Self::dir(root).join("index.db")
    }

    /// Falls back to defaults when unconfigured or unreadable, rather than
    /// failing commands that don't strictly need a config file.
    pub fn load(root: &Path) -> Self {
        std::fs::read_to_string(Self::config_path(root))
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, root: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(Self::dir(root))?;
        std::fs::write(Self::config_path(root), serde_json::to_string_pretty(self)?)
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            max_concurrency: self.max_concurrency,
            per_file_timeout_ms: self.per_file_timeout_ms,
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            debounce_ms: self.debounce_ms,
        }
    }
}
