//! Heuristic MCP compliance check over a package manifest.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::PackageManifest;
use crate::process::{CommandRunner, HostCommand, ProcessError};
use crate::retry::{RetryPolicy, Retryable};

/// Dependency namespace of the official MCP SDK packages.
pub const MCP_DEPENDENCY_PREFIX: &str = "@modelcontextprotocol/";
/// Substring searched for anywhere in the manifest.
pub const MCP_MARKER: &str = "modelcontextprotocol";

#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("registry query failed: {0}")]
    Registry(#[from] ProcessError),
    #[error("registry returned malformed manifest for {package}: {source}")]
    Malformed {
        package: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Retryable for ComplianceError {
    fn is_retryable(&self) -> bool {
        match self {
            ComplianceError::Registry(e) => e.is_retryable(),
            ComplianceError::Malformed { .. } => false,
        }
    }
}

/// Read `<dir>/package.json`. Missing or invalid files give an empty manifest.
pub fn read_local_manifest(dir: &Path) -> PackageManifest {
    let path = dir.join("package.json");
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            error!("package.json not found in {}: {e}", dir.display());
            return PackageManifest::default();
        }
    };
    match PackageManifest::parse(&content) {
        Ok(m) => m,
        Err(e) => {
            error!("Invalid package.json in {}: {e}", dir.display());
            PackageManifest::default()
        }
    }
}

/// `npm view <package> --json`.
pub fn fetch_registry_manifest(
    runner: &dyn CommandRunner,
    package: &str,
) -> Result<PackageManifest, ComplianceError> {
    let stdout = runner.run_checked(&HostCommand::new("npm", ["view", package, "--json"]))?;
    let value: Value = serde_json::from_str(&stdout).map_err(|source| ComplianceError::Malformed {
        package: package.to_string(),
        source,
    })?;
    // A version range can match several versions; npm then prints an array.
    let value = match value {
        Value::Array(mut versions) => versions.pop().unwrap_or(Value::Null),
        other => other,
    };
    Ok(PackageManifest::from_value(value))
}

/// True when any marker is present: an `@modelcontextprotocol/` dependency,
/// the protocol name anywhere in the manifest, or `capabilities.tools`.
pub fn is_manifest_compliant(manifest: &PackageManifest) -> bool {
    let has_mcp_deps = manifest
        .dependency_names()
        .any(|dep| dep.starts_with(MCP_DEPENDENCY_PREFIX));
    has_mcp_deps || manifest.mentions(MCP_MARKER) || manifest.declares_tools()
}

pub struct ComplianceChecker<'a> {
    runner: &'a dyn CommandRunner,
    retry: RetryPolicy,
}

impl<'a> ComplianceChecker<'a> {
    pub fn new(runner: &'a dyn CommandRunner, retry: RetryPolicy) -> Self {
        Self { runner, retry }
    }

    /// Check `package_name`, reading the manifest from `local_path` when given
    /// or from the npm registry otherwise. Never fails: exhausted retries and
    /// non-retryable errors both count as not compliant.
    pub fn is_compliant(&self, package_name: &str, local_path: Option<&Path>) -> bool {
        let max = self.retry.max_attempts;
        let result = self.retry.run("Compliance check", |attempt| {
            info!("Checking MCP compliance for {package_name} (attempt {attempt}/{max})");
            match local_path {
                Some(dir) => Ok(read_local_manifest(dir)),
                None => fetch_registry_manifest(self.runner, package_name),
            }
        });

        match result {
            Ok(manifest) => {
                let compliant = is_manifest_compliant(&manifest);
                if compliant {
                    info!("Package {package_name} is MCP-compliant");
                } else {
                    warn!("Package {package_name} is not MCP-compliant");
                }
                compliant
            }
            Err(_) => false,
        }
    }
}
