//! `smithery.yaml` generation for publishing a server on smithery.ai.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::{EnvMap, TransportKind};

pub const SMITHERY_FILE: &str = "smithery.yaml";

const HEADER: &str = "# Smithery configuration file: https://smithery.ai/docs/config#smitheryyaml\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmitheryConfig {
    pub start_command: StartCommand,
    pub config_schema: ConfigSchema,
    /// JS function producing the launch command from a config object.
    pub command_function: String,
    pub example_config: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartCommand {
    #[serde(rename = "type")]
    pub kind: TransportKind,
}

/// JSON Schema for the config object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, SchemaProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to serialize smithery.yaml: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("Failed to write {}: {0}", .1.display())]
    Write(#[source] io::Error, PathBuf),
}

/// Build the descriptor. Every env key becomes a required string property.
pub fn smithery_config(command: &str, args: &[String], env: &EnvMap) -> SmitheryConfig {
    let properties = env
        .keys()
        .map(|key| {
            let prop = SchemaProperty {
                kind: "string".to_string(),
                description: format!("Environment variable: {key}"),
            };
            (key.clone(), prop)
        })
        .collect();

    SmitheryConfig {
        start_command: StartCommand {
            kind: TransportKind::Stdio,
        },
        config_schema: ConfigSchema {
            kind: "object".to_string(),
            properties,
            required: env.keys().cloned().collect(),
        },
        command_function: command_function(command, args, env),
        example_config: BTreeMap::new(),
    }
}

fn command_function(command: &str, args: &[String], env: &EnvMap) -> String {
    let quote = |s: &str| serde_json::Value::from(s).to_string();
    let args = args.iter().map(|a| quote(a.as_str())).collect::<Vec<_>>().join(", ");
    let mut body = format!("command: {}, args: [{}]", quote(command), args);
    if !env.is_empty() {
        let mapping = env
            .keys()
            .map(|k| format!("{}: config[{}]", quote(k.as_str()), quote(k.as_str())))
            .collect::<Vec<_>>()
            .join(", ");
        body.push_str(&format!(", env: {{ {mapping} }}"));
    }
    format!("(config) => ({{ {body} }})")
}

/// Writes `smithery.yaml` to a fixed location, overwriting any existing file.
#[derive(Debug, Clone)]
pub struct ManifestEmitter {
    path: PathBuf,
}

impl ManifestEmitter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn emit(
        &self,
        package_name: &str,
        command: &str,
        args: &[String],
        env: &EnvMap,
    ) -> Result<&Path, EmitError> {
        info!("Generating {SMITHERY_FILE} for {package_name}");
        let config = smithery_config(command, args, env);
        let yaml = serde_yaml::to_string(&config)?;
        std::fs::write(&self.path, format!("{HEADER}{yaml}"))
            .map_err(|e| EmitError::Write(e, self.path.clone()))?;
        info!("Successfully generated {SMITHERY_FILE} for {package_name}");
        Ok(self.path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn env_keys_become_required_string_properties() {
        let config = smithery_config("npx", &["-y".to_string(), "pkg".to_string()], &env_of(&[("API_KEY", "x")]));
        assert_eq!(config.config_schema.required, vec!["API_KEY".to_string()]);
        assert_eq!(config.config_schema.properties["API_KEY"].kind, "string");
        assert_eq!(
            config.config_schema.properties["API_KEY"].description,
            "Environment variable: API_KEY"
        );
        assert!(config.example_config.is_empty());
    }

    #[test]
    fn command_function_embeds_literal_values() {
        let f = command_function("npx", &["-y".to_string(), "weather".to_string()], &EnvMap::new());
        assert_eq!(f, r#"(config) => ({ command: "npx", args: ["-y", "weather"] })"#);

        let f = command_function("node", &[], &env_of(&[("TOKEN", "t")]));
        assert_eq!(
            f,
            r#"(config) => ({ command: "node", args: [], env: { "TOKEN": config["TOKEN"] } })"#
        );
    }

    #[test]
    fn emit_writes_parseable_yaml() {
        let tmp = tempfile::tempdir().expect("tempdir should succeed");
        let emitter = ManifestEmitter::new(tmp.path().join(SMITHERY_FILE));
        std::fs::write(emitter.path(), "stale").unwrap();

        emitter
            .emit("pkg", "npx", &["-y".to_string(), "pkg".to_string()], &env_of(&[("API_KEY", "x")]))
            .expect("emit should succeed");

        let text = std::fs::read_to_string(emitter.path()).unwrap();
        assert!(text.starts_with("# Smithery configuration file"));
        let parsed: SmitheryConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.start_command.kind, TransportKind::Stdio);
        assert_eq!(parsed.config_schema.required, vec!["API_KEY".to_string()]);
        assert!(parsed.command_function.contains(r#"["-y", "pkg"]"#));
    }

    #[test]
    fn no_env_omits_required() {
        let config = smithery_config("npx", &[], &EnvMap::new());
        let value = serde_json::to_value(&config).unwrap();
        assert!(value["configSchema"].get("required").is_none());
        assert_eq!(value["startCommand"]["type"], "stdio");
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir should succeed");
        let emitter = ManifestEmitter::new(tmp.path().join("missing").join(SMITHERY_FILE));
        let err = emitter.emit("pkg", "npx", &[], &EnvMap::new()).unwrap_err();
        assert!(matches!(err, EmitError::Write(..)));
    }
}
