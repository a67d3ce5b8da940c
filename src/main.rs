//! mcp-installer CLI

use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcp_installer::paths::expand_tilde;
use mcp_installer::{
    install_supabase, parse_env_pairs, Installed, Installer, ManifestEmitter, ReqwestFetcher,
    Settings, SupabaseOptions, SystemRunner,
};

#[derive(Parser)]
#[command(name = "mcp-installer")]
#[command(about = "Install and configure MCP servers for Cursor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// MCP configuration file (default: ~/.cursor/mcp.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<String>,
}

#[derive(Args)]
struct LaunchArgs {
    /// Arguments to pass to the MCP server; takes every token after it,
    /// so give it last
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    args: Vec<String>,

    /// Environment variables in KEY=VALUE format
    #[arg(long, num_args = 1..)]
    env: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install an MCP server via npm/uvx
    Install {
        /// Package name
        name: String,

        #[command(flatten)]
        launch: LaunchArgs,
    },

    /// Install a local MCP server
    Local {
        /// Path to local MCP server
        path: String,

        #[command(flatten)]
        launch: LaunchArgs,
    },

    /// Install an MCP server from a URL (GitHub, npm, etc.)
    Url {
        /// URL to install from
        url: String,

        #[command(flatten)]
        launch: LaunchArgs,

        /// Auto-detect args and env variables
        #[arg(long)]
        auto_detect: bool,
    },

    /// Install and configure the Supabase MCP server
    Supabase {
        /// Supabase project URL
        #[arg(long)]
        url: String,

        /// Supabase API key (service_role key for full access)
        #[arg(long)]
        key: String,

        /// Supabase project reference
        #[arg(long = "ref")]
        project_ref: Option<String>,

        /// Supabase Management API URL
        #[arg(long)]
        api_url: Option<String>,
    },

    /// Generate smithery.yaml for an MCP server
    Smithery {
        /// Server name
        name: String,

        /// Command to run
        #[arg(long, default_value = "npx")]
        command: String,

        #[command(flatten)]
        launch: LaunchArgs,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.debug);

    let mut settings = Settings::resolve();
    if let Some(path) = &cli.config {
        settings.paths = settings.paths.with_config_file(path);
    }

    let success = run(cli.command, &settings);
    std::process::exit(if success { 0 } else { 1 });
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "mcp_installer=debug,info" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(command: Commands, settings: &Settings) -> bool {
    let runner = SystemRunner;
    let http = match ReqwestFetcher::new() {
        Ok(h) => h,
        Err(e) => {
            error!("{e}");
            return false;
        }
    };
    let installer = Installer::new(settings, &runner, &http);

    let result = match command {
        Commands::Install { name, launch } => {
            let env = parse_env_pairs(&launch.env);
            installer.install_package(&name, &launch.args, &env)
        }
        Commands::Local { path, launch } => {
            let env = parse_env_pairs(&launch.env);
            installer.install_local(&expand_tilde(&path), &launch.args, &env)
        }
        Commands::Url {
            url,
            launch,
            auto_detect,
        } => {
            let env = parse_env_pairs(&launch.env);
            installer.install_url(&url, &launch.args, &env, auto_detect)
        }
        Commands::Supabase {
            url,
            key,
            project_ref,
            api_url,
        } => {
            let opts = SupabaseOptions {
                url,
                api_key: key,
                project_ref,
                management_api: api_url,
            };
            install_supabase(&installer, &opts)
        }
        Commands::Smithery {
            name,
            command,
            launch,
        } => {
            let env = parse_env_pairs(&launch.env);
            let emitter = ManifestEmitter::new(settings.paths.smithery_file());
            return match emitter.emit(&name, &command, &launch.args, &env) {
                Ok(path) => {
                    println!("Wrote {}", path.display());
                    true
                }
                Err(e) => {
                    error!("{e}");
                    false
                }
            };
        }
    };

    match result {
        Ok(Installed { name, entry }) => {
            println!(
                "Installed {} ({} {})",
                name,
                entry.command,
                entry.args.join(" ")
            );
            true
        }
        Err(e) => {
            error!("{e}");
            false
        }
    }
}
