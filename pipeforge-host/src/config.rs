use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use pipeforge_common::error::Error;

#[derive(Debug, Deserialize, Clone)]
pub struct HostConfig {
    /// Directory scanned for plugin executables at startup.
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,

    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    #[serde(default = "default_apply_timeout_secs")]
    pub apply_timeout_secs: u64,

    /// Bind address for the HTTP API surface.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("./plugins")
}

fn default_handshake_timeout_secs() -> u64 {
    10
}

fn default_apply_timeout_secs() -> u64 {
    60
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plugin_dir: default_plugin_dir(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            apply_timeout_secs: default_apply_timeout_secs(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl HostConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.apply_timeout_secs)
    }

    pub async fn load(path: &Path) -> Result<Self, Error> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!(
                "failed to read host config at {}: {}",
                path.display(),
                e
            ))
        })?;

        parse_yaml(&raw)
    }
}

pub fn parse_yaml(yaml_str: &str) -> Result<HostConfig, Error> {
    let config: HostConfig = serde_yaml::from_str(yaml_str).map_err(|e| {
        let err = if let Some(location) = e.location() {
            ParseError::InvalidYaml {
                line: location.line(),
                column: location.column(),
                message: e.to_string(),
            }
        } else {
            ParseError::InvalidYamlNoLocation {
                message: e.to_string(),
            }
        };
        Error::Config(err.to_string())
    })?;

    Ok(config)
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid YAML config at line {line}, column {column}: {message}")]
    InvalidYaml {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid YAML config: {message}")]
    InvalidYamlNoLocation { message: String },
}
