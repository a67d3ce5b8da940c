//! Registry file load/save.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::models::Registry;
use crate::retry::Retryable;

/// Reads and overwrites the registry JSON file. No locking: concurrent
/// writers race and the last one wins.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry. A missing file yields an empty registry and only
    /// creates the parent directory; the file itself is written by `save`.
    pub fn load(&self) -> Result<Registry, ConfigError> {
        if !self.path.exists() {
            debug!("No config at {}, starting empty", self.path.display());
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::CreateDir(e, parent.to_path_buf()))?;
            }
            return Ok(Registry::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::ReadFailed(e, self.path.clone()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed(e, self.path.clone()))
    }

    /// Overwrite the file with `registry`.
    pub fn save(&self, registry: &Registry) -> Result<(), ConfigError> {
        let output = serde_json::to_string_pretty(registry).map_err(ConfigError::SerializeFailed)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::CreateDir(e, parent.to_path_buf()))?;
        }
        std::fs::write(&self.path, output + "\n")
            .map_err(|e| ConfigError::WriteFailed(e, self.path.clone()))?;
        debug!("Wrote {} server(s) to {}", registry.len(), self.path.display());
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to create directory {}: {0}", .1.display())]
    CreateDir(#[source] io::Error, PathBuf),
    #[error("Failed to read config {}: {0}", .1.display())]
    ReadFailed(#[source] io::Error, PathBuf),
    #[error("Failed to parse config {}: {0}", .1.display())]
    ParseFailed(#[source] serde_json::Error, PathBuf),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[source] serde_json::Error),
    #[error("Failed to write config {}: {0}", .1.display())]
    WriteFailed(#[source] io::Error, PathBuf),
}

impl Retryable for ConfigError {
    /// Filesystem hiccups may clear up; a malformed file will not.
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConfigError::CreateDir(..) | ConfigError::ReadFailed(..) | ConfigError::WriteFailed(..)
        )
    }
}
