use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TLS needs both a certificate and a key")]
    IncompleteTls,
}

/// Listener and asset settings. Every field has a default, so an empty file
/// (or no file) is valid.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub static_dir: PathBuf,
    /// PEM certificate chain; TLS is enabled when this and `key` are set.
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    /// Maximum accepted upload size in bytes.
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            static_dir: PathBuf::from("static"),
            cert: None,
            key: None,
            body_limit: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ServerConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ServerConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ServerConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ServerConfigError> {
        match (&self.cert, &self.key) {
            (Some(_), None) | (None, Some(_)) => Err(ServerConfigError::IncompleteTls),
            _ => Ok(()),
        }
    }

    /// Certificate and key paths, when TLS is configured.
    pub fn tls(&self) -> Option<(&Path, &Path)> {
        Some((self.cert.as_deref()?, self.key.as_deref()?))
    }
}
