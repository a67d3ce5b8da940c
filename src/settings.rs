//! Process-wide settings, resolved once at startup and passed explicitly.

use crate::paths::Paths;
use crate::retry::RetryPolicy;

pub const MAX_RETRIES_ENV: &str = "MCP_INSTALLER_MAX_RETRIES";
pub const UVX_FALLBACK_ENV: &str = "MCP_INSTALLER_UVX_FALLBACK";

/// Which tools a registry-package install needs, and which launcher it picks.
///
/// `RequireNpm` keeps the historical guard: node and npm must both be present,
/// which makes the `uvx` branch of launcher selection unreachable.
/// `UvxFallback` only requires node plus one of npm/uvx, so the `uvx` branch
/// is taken when npm is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LauncherPolicy {
    #[default]
    RequireNpm,
    UvxFallback,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub paths: Paths,
    pub retry: RetryPolicy,
    pub launcher: LauncherPolicy,
}

impl Settings {
    /// Resolve from the environment.
    pub fn resolve() -> Self {
        let mut retry = RetryPolicy::default();
        if let Some(n) = std::env::var(MAX_RETRIES_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
        {
            retry = retry.with_max_attempts(n);
        }

        let launcher = match std::env::var(UVX_FALLBACK_ENV) {
            Ok(v) if matches!(v.trim(), "1" | "true" | "yes") => LauncherPolicy::UvxFallback,
            _ => LauncherPolicy::RequireNpm,
        };

        Self {
            paths: Paths::resolve(),
            retry,
            launcher,
        }
    }

    pub fn new(paths: Paths, retry: RetryPolicy, launcher: LauncherPolicy) -> Self {
        Self {
            paths,
            retry,
            launcher,
        }
    }
}
