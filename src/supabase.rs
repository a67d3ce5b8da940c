//! Preset installer for the Supabase MCP server.

use tracing::{error, info, warn};

use crate::install::{InstallError, Installed, Installer};
use crate::models::EnvMap;
use crate::process::HostCommand;

pub const SUPABASE_PACKAGE: &str = "supabase-mcp-server";
/// Source used when the package is not published on npm.
pub const SUPABASE_REPOSITORY: &str = "https://github.com/Deploya-labs/mcp-supabase";
pub const SUPABASE_CHECKOUT_DIR: &str = "temp-supabase-mcp";

#[derive(Debug, Clone, Default)]
pub struct SupabaseOptions {
    pub url: String,
    pub api_key: String,
    pub project_ref: Option<String>,
    pub management_api: Option<String>,
}

impl SupabaseOptions {
    pub fn env(&self) -> EnvMap {
        let mut env = EnvMap::new();
        env.insert("SUPABASE_URL".to_string(), self.url.clone());
        env.insert("SUPABASE_API_KEY".to_string(), self.api_key.clone());
        if let Some(r) = &self.project_ref {
            env.insert("SUPABASE_PROJECT_REF".to_string(), r.clone());
        }
        if let Some(a) = &self.management_api {
            env.insert("SUPABASE_MANAGEMENT_API".to_string(), a.clone());
        }
        env
    }
}

/// Install `supabase-mcp-server` from npm, or build it from the GitHub
/// repository when npm does not know the package.
pub fn install_supabase(
    installer: &Installer<'_>,
    opts: &SupabaseOptions,
) -> Result<Installed, InstallError> {
    info!("Installing and configuring Supabase MCP server");
    let env = opts.env();

    let published = installer
        .runner()
        .run_checked(&HostCommand::new("npm", ["view", SUPABASE_PACKAGE, "version"]));

    let result = match published {
        Ok(_) => installer.install_package(SUPABASE_PACKAGE, &[], &env),
        Err(e) => {
            warn!("Supabase MCP server package not found in npm registry: {e}");
            info!("Installing from GitHub instead...");
            install_from_source(installer, &env).inspect_err(|e| {
                error!("Failed to install from GitHub: {e}");
                info!("{}", manual_instructions());
            })
        }
    };

    match &result {
        Ok(_) => {
            info!("Supabase MCP server installed and configured successfully");
            info!("Restart Cursor for the changes to take effect");
        }
        Err(_) => error!("Failed to install Supabase MCP server"),
    }
    result
}

fn install_from_source(
    installer: &Installer<'_>,
    env: &EnvMap,
) -> Result<Installed, InstallError> {
    let checkout = installer.work_dir().join(SUPABASE_CHECKOUT_DIR);
    if checkout.exists() {
        std::fs::remove_dir_all(&checkout).map_err(|e| InstallError::Cleanup(e, checkout.clone()))?;
    }
    installer.clone_repository(SUPABASE_REPOSITORY, &checkout)?;
    installer.install_local(&checkout, &[], env)
}

fn manual_instructions() -> String {
    format!(
        "To install Supabase MCP manually:\n\
         1. Clone the repository: git clone {SUPABASE_REPOSITORY}\n\
         2. Install dependencies: cd mcp-supabase && npm install\n\
         3. Register it: mcp-installer local ./mcp-supabase --env SUPABASE_URL=<your-url> SUPABASE_API_KEY=<your-key>"
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::http::fake::Offline;
    use crate::models::{Launcher, RegistryEntry};
    use crate::paths::Paths;
    use crate::process::fake::ScriptedRunner;
    use crate::process::CommandOutput;
    use crate::retry::RetryPolicy;
    use crate::settings::{LauncherPolicy, Settings};

    fn settings(dir: &Path) -> Settings {
        Settings::new(
            Paths::new(dir.join("mcp.json"), dir),
            RetryPolicy::new(2, Duration::ZERO),
            LauncherPolicy::RequireNpm,
        )
    }

    fn opts() -> SupabaseOptions {
        SupabaseOptions {
            url: "https://abc.supabase.co".into(),
            api_key: "service-key".into(),
            project_ref: Some("abc".into()),
            management_api: None,
        }
    }

    #[test]
    fn env_uses_fixed_names() {
        let env = opts().env();
        assert_eq!(env["SUPABASE_URL"], "https://abc.supabase.co");
        assert_eq!(env["SUPABASE_API_KEY"], "service-key");
        assert_eq!(env["SUPABASE_PROJECT_REF"], "abc");
        assert!(!env.contains_key("SUPABASE_MANAGEMENT_API"));
    }

    #[test]
    fn published_package_installs_from_npm() {
        let tmp = tempfile::tempdir().expect("tempdir should succeed");
        let settings = settings(tmp.path());
        let runner = ScriptedRunner::new()
            .on("npm view supabase-mcp-server version", CommandOutput::ok("0.3.0"))
            .on("node --version", CommandOutput::ok("v20"))
            .on("npm --version", CommandOutput::ok("10"))
            .on(
                "npm view supabase-mcp-server --json",
                CommandOutput::ok(r#"{"dependencies":{"@modelcontextprotocol/sdk":"1"}}"#),
            );
        let installer = Installer::new(&settings, &runner, &Offline);

        let installed = install_supabase(&installer, &opts()).unwrap();
        assert_eq!(installed.name, SUPABASE_PACKAGE);
        assert_eq!(installed.entry.command, Launcher::Npx);
        assert_eq!(installed.entry.env, opts().env());
        assert!(runner.calls.borrow().iter().all(|c| c.program != "git"));
    }

    #[test]
    fn unpublished_package_falls_back_to_repository() {
        let tmp = tempfile::tempdir().expect("tempdir should succeed");
        let settings = settings(tmp.path());
        let checkout = tmp.path().join(SUPABASE_CHECKOUT_DIR);
        let clone_line = format!("git clone {SUPABASE_REPOSITORY} {}", checkout.display());
        let cloned = checkout.clone();
        let runner = ScriptedRunner::new()
            .on("npm view supabase-mcp-server version", CommandOutput::failed(1, "E404"))
            .on_with(&clone_line, CommandOutput::ok(""), move |_| {
                std::fs::create_dir_all(&cloned).unwrap();
                std::fs::write(
                    cloned.join("package.json"),
                    r#"{"name":"mcp-supabase","dependencies":{"@modelcontextprotocol/sdk":"^1"}}"#,
                )
                .unwrap();
            })
            .on("npm install", CommandOutput::ok(""));
        let installer = Installer::new(&settings, &runner, &Offline);

        let installed = install_supabase(&installer, &opts()).expect("install should succeed");

        assert_eq!(runner.calls_to(&clone_line), 1);
        assert_eq!(runner.calls_to("npm view supabase-mcp-server --json"), 0);
        assert_eq!(installed.name, "mcp-supabase");
        assert_eq!(installed.entry.command, Launcher::Node);
        assert_eq!(
            installed.entry.args,
            vec![checkout.join("index.js").to_string_lossy().into_owned()]
        );
        assert_eq!(installed.entry.env, opts().env());
        let registry = installer.store().load().unwrap();
        assert_eq!(
            registry.get("mcp-supabase"),
            Some(&RegistryEntry::Managed(installed.entry))
        );
    }

    #[test]
    fn clone_without_checkout_is_reported() {
        let tmp = tempfile::tempdir().expect("tempdir should succeed");
        let settings = settings(tmp.path());
        let checkout = tmp.path().join(SUPABASE_CHECKOUT_DIR);
        let clone_line = format!("git clone {SUPABASE_REPOSITORY} {}", checkout.display());
        let runner = ScriptedRunner::new()
            .on("npm view supabase-mcp-server version", CommandOutput::failed(1, "E404"))
            .on(&clone_line, CommandOutput::ok(""))
            .on("npm install", CommandOutput::ok(""));
        let installer = Installer::new(&settings, &runner, &Offline);

        let err = install_supabase(&installer, &opts()).unwrap_err();
        assert!(matches!(err, InstallError::PathNotFound(_)));
        assert!(!settings.paths.config_file().exists());
    }

    #[test]
    fn failed_clone_is_reported() {
        let tmp = tempfile::tempdir().expect("tempdir should succeed");
        let settings = settings(tmp.path());
        std::fs::create_dir_all(tmp.path().join(SUPABASE_CHECKOUT_DIR).join("stale")).unwrap();
        let runner = ScriptedRunner::new();
        let installer = Installer::new(&settings, &runner, &Offline);

        let err = install_supabase(&installer, &opts()).unwrap_err();
        assert!(matches!(err, InstallError::Process(_)));
        assert!(!tmp.path().join(SUPABASE_CHECKOUT_DIR).exists());
    }
}
