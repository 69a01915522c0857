// Configuration: YAML file layer under the CLI flags

use crate::backend::{Backend, FileBackend, MemoryBackend, SqliteBackend};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Config file name looked up inside the store directory
pub const CONFIG_FILE: &str = "taskflow.yaml";

/// SQLite database file name inside the store directory
pub const DB_FILE: &str = "taskflow.db";

/// Subdirectory used by the file backend
pub const FILES_DIR: &str = "kv";

/// Which key-value backend to persist through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Files,
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Files => write!(f, "files"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "files" | "file" => Ok(BackendKind::Files),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!(
                "Invalid backend: {} (expected sqlite, files or memory)",
                other
            )),
        }
    }
}

/// Settings read from `taskflow.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            color: true,
        }
    }
}

impl Config {
    /// Load a config file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))?;

        info!(path = ?path, backend = %config.backend, "Loaded config");
        Ok(config)
    }
}

/// Default store directory: the platform data dir, else `./.taskflow`
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("taskflow"))
        .unwrap_or_else(|| PathBuf::from(".taskflow"))
}

/// Open the configured backend rooted at `store_path`
pub fn open_backend(kind: BackendKind, store_path: &Path) -> Result<Box<dyn Backend>> {
    debug!(backend = %kind, path = ?store_path, "Opening backend");

    let backend: Box<dyn Backend> = match kind {
        BackendKind::Sqlite => Box::new(SqliteBackend::open(store_path.join(DB_FILE))?),
        BackendKind::Files => Box::new(FileBackend::open(store_path.join(FILES_DIR))?),
        BackendKind::Memory => Box::new(MemoryBackend::new()),
    };

    Ok(backend)
}
