//! Data structures for the registry file and package manifests.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Environment variables for a server, keyed by name.
pub type EnvMap = BTreeMap<String, String>;

/// Registry file at `~/.cursor/mcp.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    #[serde(default)]
    pub mcp_servers: BTreeMap<String, RegistryEntry>,
    /// Top-level keys owned by other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.mcp_servers.get(name)
    }

    /// Insert or replace the entry for `name`.
    pub fn upsert(&mut self, name: &str, entry: ServerEntry) {
        self.mcp_servers
            .insert(name.to_string(), RegistryEntry::Managed(entry));
    }

    pub fn len(&self) -> usize {
        self.mcp_servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mcp_servers.is_empty()
    }
}

/// A registry value: either an entry in the shape this tool writes, or
/// anything else, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RegistryEntry {
    Managed(ServerEntry),
    Foreign(Value),
}

impl<'de> Deserialize<'de> for RegistryEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RegistryEntry::from_value)
    }
}

impl RegistryEntry {
    /// Managed only when serializing the parsed entry reproduces `value`
    /// exactly, so saving never rewrites another tool's entry.
    pub fn from_value(value: Value) -> Self {
        match ServerEntry::deserialize(&value) {
            Ok(entry) if serde_json::to_value(&entry).ok().as_ref() == Some(&value) => {
                RegistryEntry::Managed(entry)
            }
            _ => RegistryEntry::Foreign(value),
        }
    }

    pub fn as_managed(&self) -> Option<&ServerEntry> {
        match self {
            RegistryEntry::Managed(entry) => Some(entry),
            RegistryEntry::Foreign(_) => None,
        }
    }
}

/// Launch specification for a stdio MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerEntry {
    pub command: Launcher,
    pub args: Vec<String>,
    #[serde(rename = "type")]
    pub transport: TransportKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: EnvMap,
}

impl ServerEntry {
    pub fn stdio(command: Launcher, args: Vec<String>, env: EnvMap) -> Self {
        Self {
            command,
            args,
            transport: TransportKind::Stdio,
            env,
        }
    }
}

/// Executables a server entry may launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Launcher {
    Node,
    Npx,
    Uvx,
}

impl Launcher {
    pub fn as_str(&self) -> &'static str {
        match self {
            Launcher::Node => "node",
            Launcher::Npx => "npx",
            Launcher::Uvx => "uvx",
        }
    }
}

impl fmt::Display for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stdio,
}

/// A package's `package.json` (or `npm view --json` output), read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest(Value);

impl Default for PackageManifest {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl PackageManifest {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }

    /// Declared `name`.
    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Keys of the `dependencies` object.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.0
            .get("dependencies")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|deps| deps.keys().map(String::as_str))
    }

    /// Whether the serialized manifest contains `needle` anywhere.
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.to_string().contains(needle)
    }

    /// Whether `capabilities` is an object with a `tools` key.
    pub fn declares_tools(&self) -> bool {
        self.0
            .get("capabilities")
            .and_then(Value::as_object)
            .is_some_and(|caps| caps.contains_key("tools"))
    }

    /// `(name, value)` pairs of an object-valued field, string values only.
    pub fn string_map(&self, key: &str) -> Vec<(&str, &str)> {
        self.0
            .get(key)
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Build an [`EnvMap`] from `KEY=VALUE` tokens. The value may contain `=`;
/// later duplicates win; tokens without `=` are dropped with a warning.
pub fn parse_env_pairs<S: AsRef<str>>(tokens: &[S]) -> EnvMap {
    let mut env = EnvMap::new();
    for token in tokens {
        let token = token.as_ref();
        match token.split_once('=') {
            Some((key, value)) => {
                env.insert(key.to_string(), value.to_string());
            }
            None => warn!("Ignoring invalid environment variable format: {token}"),
        }
    }
    env
}
