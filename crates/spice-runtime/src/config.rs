//! Process-wide runtime settings, independent of any pod manifest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spice_manifest::ModelsSpec;

pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub http_port: u16,
    pub connections: HashMap<String, ConnectionSpec>,
    pub pods: Vec<PodSettings>,
    /// Per-source deadline for a single fetch.
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            connections: HashMap::new(),
            pods: Vec::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Named credentials a connector can reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    #[serde(default)]
    pub name: String,
    /// Either a literal token or the name of an environment variable holding it.
    #[serde(default)]
    pub token: String,
}

/// Per-pod overrides carried by the runtime config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSettings {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsSpec>,
}

/// A connection with its token resolved against the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub key: String,
    pub name: String,
    pub token: String,
}

impl RuntimeConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Build from the process environment on top of defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overlay(|var| std::env::var(var).ok())
    }

    /// Apply `SPICE_*` overrides using the provided lookup.
    pub fn with_env_overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SPICE_HTTP_PORT") {
            self.http_port = port.trim().parse().map_err(|err| ConfigError::Env {
                var: "SPICE_HTTP_PORT",
                message: format!("{err}"),
            })?;
        }
        if let Some(timeout) = lookup("SPICE_FETCH_TIMEOUT") {
            self.fetch_timeout =
                humantime::parse_duration(timeout.trim()).map_err(|err| ConfigError::Env {
                    var: "SPICE_FETCH_TIMEOUT",
                    message: format!("{err}"),
                })?;
        }
        Ok(self)
    }

    pub fn server_base_url(&self) -> String {
        format!("http://localhost:{}", self.http_port)
    }

    pub fn pod_settings(&self, name: &str) -> Option<&PodSettings> {
        self.pods.iter().find(|pod| pod.name == name)
    }

    /// Look up a connection and resolve its token through `lookup`.
    pub fn resolve_connection<F>(&self, key: &str, lookup: F) -> Option<ResolvedConnection>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.connections.get(key).map(|spec| ResolvedConnection {
            key: key.to_string(),
            name: spec.name.clone(),
            token: lookup(&spec.token).unwrap_or_else(|| spec.token.clone()),
        })
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
