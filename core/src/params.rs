//! Parameters - shared proxy configuration broadcast through a flow tree.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

/// The configuration of one running proxy: where it listens and where it forwards.
///
/// Set on the root of a flow; every node reachable from the root sees the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub bind_address: IpAddr,
    pub listen_port: u16,
    pub target_host: String,
    pub target_port: u16,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listen_port: 8080,
            target_host: "localhost".to_string(),
            target_port: 80,
        }
    }
}

impl Parameters {
    pub fn new(target_host: impl Into<String>, target_port: u16) -> Self {
        Self {
            target_host: target_host.into(),
            target_port,
            ..Default::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let parameters: Parameters = toml::from_str(source)?;
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_host.trim().is_empty() {
            return Err(ConfigError::Invalid("target_host must not be empty".into()));
        }
        if self.listen_port == 0 {
            return Err(ConfigError::Invalid("listen_port must be non-zero".into()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.listen_port)
    }

    /// `host:port` of the upstream target.
    pub fn target_authority(&self) -> String {
        format!("{}:{}", self.target_host, self.target_port)
    }
}
