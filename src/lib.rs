//! mcp-installer - MCP server registration for Cursor
//!
//! Registers MCP servers in `~/.cursor/mcp.json` from npm packages, local
//! checkouts or GitHub repositories, and writes a `smithery.yaml` for each.

pub mod compliance;
pub mod config;
pub mod environment;
pub mod http;
pub mod install;
pub mod metadata;
pub mod models;
pub mod paths;
pub mod process;
pub mod retry;
pub mod settings;
pub mod smithery;
pub mod supabase;

pub use compliance::{is_manifest_compliant, ComplianceChecker};
pub use config::{ConfigError, ConfigStore};
pub use environment::{check_environment, ToolStatus};
pub use http::{HttpFetch, ReqwestFetcher};
pub use install::{InstallError, Installed, Installer};
pub use metadata::{MetadataFetcher, PackageMetadata};
pub use models::{parse_env_pairs, EnvMap, Launcher, Registry, RegistryEntry, ServerEntry};
pub use paths::Paths;
pub use process::{CommandRunner, SystemRunner};
pub use retry::RetryPolicy;
pub use settings::{LauncherPolicy, Settings};
pub use smithery::ManifestEmitter;
pub use supabase::{install_supabase, SupabaseOptions};
