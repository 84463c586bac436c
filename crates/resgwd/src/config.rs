//! Daemon configuration

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Complete daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Public listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Devices registered (and probed) at startup
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path))?;
        Ok(config)
    }
}

/// Public listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request response deadline in milliseconds
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_response_timeout_ms() -> u64 {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

/// One device registration entry. Entries with a missing name, ip, or
/// port are skipped at startup, not rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Device name
    #[serde(default)]
    pub name: String,

    /// Device IP address
    #[serde(default)]
    pub ip: String,

    /// Device TCP port
    #[serde(default)]
    pub port: u16,
}
