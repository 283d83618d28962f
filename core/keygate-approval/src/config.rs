//! Configuration for opening a durable workflow.

use keygate_types::Catalog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::StoreResult;

/// Where and how catalog stores keep their data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base SQLite database path. Each catalog gets its own file derived from
    /// it (see [`Self::catalog_path`]). `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    /// How long a connection waits on a locked database (ms).
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// The database file for `catalog`: the catalog name is inserted before
    /// the extension, so `choices.db` becomes `choices.router.db`.
    #[must_use]
    pub fn catalog_path(&self, catalog: Catalog) -> Option<PathBuf> {
        let base = self.path.as_ref()?;
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "keygate".to_string());
        let file_name = match base.extension() {
            Some(ext) => format!("{stem}.{catalog}.{}", ext.to_string_lossy()),
            None => format!("{stem}.{catalog}"),
        };
        Some(base.with_file_name(file_name))
    }
}

/// Top-level configuration for an [`ApprovalWorkflow`](crate::ApprovalWorkflow)
/// backed by SQLite stores and a roster file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Catalog storage.
    pub store: StoreConfig,
    /// JSON roster of administrators.
    pub roster_path: PathBuf,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            roster_path: PathBuf::from("admins.json"),
        }
    }
}

impl ApprovalConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
