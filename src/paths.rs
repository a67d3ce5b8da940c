//! Path resolution for the client configuration file.
//!
//! Uses env vars when set, otherwise the home-directory default.

use std::path::{Path, PathBuf};

/// Env var overriding the registry file location.
pub const CONFIG_PATH_ENV: &str = "MCP_INSTALLER_CONFIG";

/// Resolved paths used by every component.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config_file: PathBuf,
    pub work_dir: PathBuf,
}

impl Paths {
    /// Resolve paths from environment, falling back to `~/.cursor/mcp.json`
    /// and the current directory.
    pub fn resolve() -> Self {
        let config_file = resolve_path(
            CONFIG_PATH_ENV,
            dirs::home_dir().map(|p| p.join(".cursor").join("mcp.json")),
            "~/.cursor/mcp.json",
        );
        let work_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        Self {
            config_file,
            work_dir,
        }
    }

    /// Build from explicit locations (tests, `--config`).
    pub fn new(config_file: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Replace the config file location, expanding `~`.
    pub fn with_config_file(mut self, path: &str) -> Self {
        self.config_file = expand_tilde(path);
        self
    }

    /// Registry JSON file (`mcp.json`).
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Directory receiving `smithery.yaml` and cloned repositories.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Location of the generated Smithery descriptor.
    pub fn smithery_file(&self) -> PathBuf {
        self.work_dir.join(crate::smithery::SMITHERY_FILE)
    }
}

fn resolve_path(env_var: &str, default: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Ok(val) = std::env::var(env_var) {
        let trimmed = val.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }
    default.unwrap_or_else(|| expand_tilde(fallback))
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}
