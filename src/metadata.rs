//! Best-effort discovery of env vars a server probably needs.
//!
//! Everything here is a guess scraped from manifests and free text. Results
//! are suggestions the caller can accept, override or ignore.

use tracing::{info, warn};

use crate::compliance::fetch_registry_manifest;
use crate::http::HttpFetch;
use crate::models::{EnvMap, PackageManifest};
use crate::process::CommandRunner;

/// Value given to scraped variables whose real value is unknown.
pub const PLACEHOLDER: &str = "<YOUR_VALUE>";

/// Substrings that mark a token in a description or readme as an env var.
pub const ENV_PATTERNS: [&str; 10] = [
    "API_KEY", "TOKEN", "SECRET", "PASSWORD", "USERNAME", "ENDPOINT", "URL", "HOST", "PORT",
    "DATABASE",
];

const TEXT_PUNCTUATION: &[char] = &['\'', '"', ',', '.', ';', ':', '(', ')', '[', ']', '{', '}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionSource {
    /// `engines` entry in package.json.
    Engine,
    /// `$VAR` reference in an npm script.
    Script,
    /// Token in the registry description or readme.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSuggestion {
    pub name: String,
    pub value: String,
    pub source: SuggestionSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub args: Vec<String>,
    pub env: Vec<EnvSuggestion>,
}

impl PackageMetadata {
    fn fallback(url: &str) -> Self {
        Self {
            name: basename(url).to_string(),
            ..Self::default()
        }
    }

    /// Suggestions as a map.
    pub fn suggested_env(&self) -> EnvMap {
        self.env
            .iter()
            .map(|s| (s.name.clone(), s.value.clone()))
            .collect()
    }

    /// Suggestions overlaid with `explicit`; explicit values win.
    pub fn merge_env(&self, explicit: &EnvMap) -> EnvMap {
        let mut env = self.suggested_env();
        env.extend(explicit.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }

    fn suggest(&mut self, name: &str, value: &str, source: SuggestionSource) {
        if name.is_empty() || self.env.iter().any(|s| s.name == name) {
            return;
        }
        self.env.push(EnvSuggestion {
            name: name.to_string(),
            value: value.to_string(),
            source,
        });
    }
}

pub struct MetadataFetcher<'a> {
    runner: &'a dyn CommandRunner,
    http: &'a dyn HttpFetch,
}

impl<'a> MetadataFetcher<'a> {
    pub fn new(runner: &'a dyn CommandRunner, http: &'a dyn HttpFetch) -> Self {
        Self { runner, http }
    }

    /// Fetch hints for a GitHub URL or bare npm package name. Never fails;
    /// any error degrades to the URL's basename with no suggestions.
    pub fn fetch(&self, url: &str) -> PackageMetadata {
        info!("Fetching package metadata from {url}");
        if is_github_url(url) {
            self.fetch_github(url)
        } else if !url.starts_with("http") {
            self.fetch_npm(url)
        } else {
            PackageMetadata::fallback(url)
        }
    }

    fn fetch_github(&self, url: &str) -> PackageMetadata {
        let raw_url = raw_github_url(url);
        let body = match self.http.get_text(&raw_url) {
            Ok(b) => b,
            Err(e) => {
                warn!("Could not fetch {raw_url}: {e}");
                return PackageMetadata::fallback(url);
            }
        };
        let manifest = match PackageManifest::parse(&body) {
            Ok(m) => m,
            Err(e) => {
                warn!("Could not parse package.json from {raw_url}: {e}");
                return PackageMetadata::fallback(url);
            }
        };

        let mut metadata = PackageMetadata {
            name: manifest.name().unwrap_or_else(|| basename(url)).to_string(),
            ..PackageMetadata::default()
        };
        for (engine, version) in manifest.string_map("engines") {
            let name = format!("{}_VERSION", engine.to_uppercase());
            metadata.suggest(&name, version, SuggestionSource::Engine);
        }
        for (_, script) in manifest.string_map("scripts") {
            for var in script_env_refs(script) {
                metadata.suggest(var, PLACEHOLDER, SuggestionSource::Script);
            }
        }
        metadata
    }

    fn fetch_npm(&self, package: &str) -> PackageMetadata {
        let manifest = match fetch_registry_manifest(self.runner, package) {
            Ok(m) => m,
            Err(e) => {
                warn!("Could not fetch npm package info for {package}: {e}");
                return PackageMetadata::fallback(package);
            }
        };

        let mut metadata = PackageMetadata {
            name: manifest.name().unwrap_or(package).to_string(),
            ..PackageMetadata::default()
        };
        for field in ["description", "readme"] {
            let text = manifest.str_field(field).unwrap_or_default();
            for var in text_env_refs(text) {
                metadata.suggest(var, PLACEHOLDER, SuggestionSource::Text);
            }
        }
        metadata
    }
}

pub fn is_github_url(url: &str) -> bool {
    url.contains("github.com")
}

/// Map a repository URL onto `raw.githubusercontent.com`, pointing at its
/// `package.json`. `owner/repo` resolves against `HEAD`; `blob/<ref>/` and
/// `tree/<ref>/` segments are collapsed to `<ref>/`.
pub fn raw_github_url(url: &str) -> String {
    let raw = match url.split_once("github.com/") {
        Some((_, path)) => {
            let path = path.trim_end_matches('/');
            let path = path.strip_suffix(".git").unwrap_or(path);
            let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            if segments.len() == 2 {
                segments.push("HEAD");
            } else if segments.len() > 3 && matches!(segments[2], "blob" | "tree") {
                segments.remove(2);
            }
            format!("https://raw.githubusercontent.com/{}", segments.join("/"))
        }
        None => url.replace("github.com", "raw.githubusercontent.com"),
    };

    if raw.ends_with("package.json") {
        raw
    } else {
        format!("{}/package.json", raw.trim_end_matches('/'))
    }
}

/// Last path segment of a URL or path.
pub fn basename(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

/// `$VAR` / `${VAR}` references in a shell snippet; `$(...)` is skipped.
fn script_env_refs(script: &str) -> impl Iterator<Item = &str> {
    script
        .split_whitespace()
        .filter(|t| t.starts_with('$') && !t.starts_with("$("))
        .map(|t| t.trim_matches('$').trim_matches(&['{', '}'][..]).trim())
        .filter(|t| !t.is_empty())
}

/// Tokens that look like env var names (contain a known pattern and `_`).
fn text_env_refs(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    for pattern in ENV_PATTERNS {
        if !text.contains(pattern) {
            continue;
        }
        for token in text.split_whitespace() {
            if token.contains(pattern) && token.contains('_') {
                let clean = token.trim_matches(TEXT_PUNCTUATION).trim();
                if !clean.is_empty() {
                    found.push(clean);
                }
            }
        }
    }
    found
}
