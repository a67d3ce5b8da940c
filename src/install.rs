//! Register MCP servers in the client configuration.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::compliance::{read_local_manifest, ComplianceChecker};
use crate::config::{ConfigError, ConfigStore};
use crate::environment::{check_environment, ToolStatus};
use crate::http::HttpFetch;
use crate::metadata::{basename, is_github_url, MetadataFetcher};
use crate::models::{EnvMap, Launcher, ServerEntry};
use crate::process::{CommandRunner, HostCommand, ProcessError};
use crate::settings::{LauncherPolicy, Settings};
use crate::smithery::ManifestEmitter;

/// A server entry that was written to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    pub name: String,
    pub entry: ServerEntry,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("{0}")]
    MissingTools(&'static str),
    #[error("Package {0} is not MCP-compliant")]
    NotCompliant(String),
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("Failed to remove {}: {0}", .1.display())]
    Cleanup(#[source] io::Error, PathBuf),
    #[error("{} exists but is not a checkout of {expected}", .path.display())]
    ForeignCheckout { path: PathBuf, expected: String },
}

/// Pick the launcher for a registry package.
///
/// Under [`LauncherPolicy::RequireNpm`] node and npm are both mandatory, so
/// the `uvx` arm below can never be reached; it only applies under
/// [`LauncherPolicy::UvxFallback`].
pub fn select_launcher(tools: ToolStatus, policy: LauncherPolicy) -> Result<Launcher, InstallError> {
    match policy {
        LauncherPolicy::RequireNpm if !tools.node || !tools.npm => {
            return Err(InstallError::MissingTools("Node.js and npm are required"));
        }
        LauncherPolicy::UvxFallback if !tools.node || !(tools.npm || tools.uvx) => {
            return Err(InstallError::MissingTools("Node.js and one of npm or uvx are required"));
        }
        _ => {}
    }
    Ok(if tools.npm { Launcher::Npx } else { Launcher::Uvx })
}

pub struct Installer<'a> {
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
    http: &'a dyn HttpFetch,
    store: ConfigStore,
    emitter: ManifestEmitter,
}

impl<'a> Installer<'a> {
    pub fn new(
        settings: &'a Settings,
        runner: &'a dyn CommandRunner,
        http: &'a dyn HttpFetch,
    ) -> Self {
        Self {
            settings,
            runner,
            http,
            store: ConfigStore::new(settings.paths.config_file()),
            emitter: ManifestEmitter::new(settings.paths.smithery_file()),
        }
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner
    }

    /// Where repositories are cloned.
    pub fn work_dir(&self) -> &Path {
        self.settings.paths.work_dir()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    fn compliance(&self) -> ComplianceChecker<'_> {
        ComplianceChecker::new(self.runner, self.settings.retry)
    }

    /// Install an npm package as `npx -y <name> <extra_args...>`.
    pub fn install_package(
        &self,
        name: &str,
        extra_args: &[String],
        env: &EnvMap,
    ) -> Result<Installed, InstallError> {
        info!("Installing MCP server {name}");

        let tools = check_environment(self.runner);
        let launcher = select_launcher(tools, self.settings.launcher)?;

        if !self.compliance().is_compliant(name, None) {
            return Err(InstallError::NotCompliant(name.to_string()));
        }

        let mut args = vec!["-y".to_string(), name.to_string()];
        args.extend_from_slice(extra_args);
        let entry = ServerEntry::stdio(launcher, args, env.clone());

        self.persist(name, &entry)?;
        self.emit(name, &entry);

        info!("Successfully installed MCP server: {name}");
        Ok(Installed {
            name: name.to_string(),
            entry,
        })
    }

    /// Install a server from a local checkout as `node <path>/index.js`.
    pub fn install_local(
        &self,
        path: &Path,
        extra_args: &[String],
        env: &EnvMap,
    ) -> Result<Installed, InstallError> {
        info!("Installing local MCP server from {}", path.display());

        if !path.exists() {
            return Err(InstallError::PathNotFound(path.to_path_buf()));
        }

        let dir_name = dir_name(path);
        if !self.compliance().is_compliant(&dir_name, Some(path)) {
            return Err(InstallError::NotCompliant(path.display().to_string()));
        }

        let manifest = read_local_manifest(path);
        let name = manifest.name().map(String::from).unwrap_or(dir_name);

        let mut args = vec![path.join("index.js").to_string_lossy().into_owned()];
        args.extend_from_slice(extra_args);
        let entry = ServerEntry::stdio(Launcher::Node, args, env.clone());

        self.persist(&name, &entry)?;
        self.emit(&name, &entry);

        info!("Successfully installed local MCP server: {name}");
        Ok(Installed { name, entry })
    }

    /// Install from a GitHub repository (clone, then local install) or treat
    /// `url` as an npm package name. With `auto_detect`, scraped env
    /// suggestions are merged under `env` and scraped args are used when
    /// `extra_args` is empty.
    pub fn install_url(
        &self,
        url: &str,
        extra_args: &[String],
        env: &EnvMap,
        auto_detect: bool,
    ) -> Result<Installed, InstallError> {
        let (package, args, env) = if auto_detect {
            let metadata = MetadataFetcher::new(self.runner, self.http).fetch(url);
            for s in &metadata.env {
                info!("Detected env var {} (from {:?})", s.name, s.source);
            }
            let args = if extra_args.is_empty() {
                metadata.args.clone()
            } else {
                extra_args.to_vec()
            };
            let package = if metadata.name.is_empty() {
                url.to_string()
            } else {
                metadata.name.clone()
            };
            (package, args, metadata.merge_env(env))
        } else {
            (url.to_string(), extra_args.to_vec(), env.clone())
        };

        if is_github_url(url) {
            let checkout = self.work_dir().join(repo_name(url));
            self.clone_repository(url, &checkout)?;
            self.install_local(&checkout, &args, &env)
        } else {
            self.install_package(&package, &args, &env)
        }
    }

    /// `git clone` into `dest`, then `npm install` inside it. An existing
    /// `dest` is reused only when its `origin` remote is `url`.
    pub fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), InstallError> {
        if dest.exists() {
            self.verify_checkout(url, dest)?;
            info!("Reusing existing checkout at {}", dest.display());
        } else {
            info!("Cloning from {url}...");
            let dest_arg = dest.to_string_lossy();
            self.runner.run_checked(
                &HostCommand::new("git", ["clone", url, &*dest_arg]).inherit_output(),
            )?;
        }

        info!("Installing dependencies...");
        self.runner
            .run_checked(&HostCommand::new("npm", ["install"]).current_dir(dest).inherit_output())?;
        Ok(())
    }

    fn verify_checkout(&self, url: &str, dest: &Path) -> Result<(), InstallError> {
        let dest_arg = dest.to_string_lossy();
        let origin = self
            .runner
            .run_checked(&HostCommand::new("git", ["-C", &*dest_arg, "remote", "get-url", "origin"]));
        match origin {
            Ok(origin) if same_remote(origin.trim(), url) => Ok(()),
            Ok(origin) => {
                warn!("{} tracks {}, not {url}", dest.display(), origin.trim());
                Err(InstallError::ForeignCheckout {
                    path: dest.to_path_buf(),
                    expected: url.to_string(),
                })
            }
            Err(e) => {
                warn!("Cannot read the origin of {}: {e}", dest.display());
                Err(InstallError::ForeignCheckout {
                    path: dest.to_path_buf(),
                    expected: url.to_string(),
                })
            }
        }
    }

    fn persist(&self, name: &str, entry: &ServerEntry) -> Result<(), ConfigError> {
        self.settings.retry.run("Saving configuration", |_| {
            let mut registry = self.store.load()?;
            registry.upsert(name, entry.clone());
            self.store.save(&registry)
        })
    }

    /// Emission is a side artifact; failures are logged only.
    fn emit(&self, name: &str, entry: &ServerEntry) {
        if let Err(e) = self
            .emitter
            .emit(name, entry.command.as_str(), &entry.args, &entry.env)
        {
            error!("Failed to generate smithery.yaml: {e}");
        }
    }
}

/// Directory name for a repository URL, without `.git`.
pub fn repo_name(url: &str) -> &str {
    let base = basename(url);
    base.strip_suffix(".git").unwrap_or(base)
}

/// Remote URLs compare equal up to a trailing `/` or `.git`.
fn same_remote(a: &str, b: &str) -> bool {
    fn normalize(url: &str) -> &str {
        let url = url.trim_end_matches('/');
        url.strip_suffix(".git").unwrap_or(url)
    }
    normalize(a) == normalize(b)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            std::fs::canonicalize(path)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| path.display().to_string())
}
