//! Host tool detection.

use tracing::{info, warn};

use crate::process::{CommandRunner, HostCommand};

/// Which launch tools answered `--version`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolStatus {
    pub node: bool,
    pub npm: bool,
    pub uvx: bool,
}

/// Probe `node`, `npm` and `uvx`. Each probe runs once; a spawn failure or
/// non-zero exit counts as missing.
pub fn check_environment(runner: &dyn CommandRunner) -> ToolStatus {
    ToolStatus {
        node: probe(runner, "node", "Node.js"),
        npm: probe(runner, "npm", "npm"),
        uvx: probe(runner, "uvx", "uvx"),
    }
}

fn probe(runner: &dyn CommandRunner, program: &str, label: &str) -> bool {
    match runner.run_checked(&HostCommand::new(program, ["--version"])) {
        Ok(version) => {
            info!("{label} is available ({})", version.trim());
            true
        }
        Err(e) => {
            warn!("{label} is not available: {e}");
            false
        }
    }
}
