//! Device simulator configuration
//!
//! Fully data-driven: the service table, value ranges, and banner lines
//! all come from TOML, so one binary can stand in for any device.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Complete simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name
    #[serde(default = "default_name")]
    pub name: String,

    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port; 0 picks an ephemeral port
    #[serde(default)]
    pub port: u16,

    /// Accept connections but never answer (for partial-failure testing)
    #[serde(default)]
    pub silent: bool,

    /// Banner lines printed before the discovery document, the way real
    /// firmware prints boot text before structured output
    #[serde(default = "default_banner")]
    pub banner: Vec<String>,

    /// Exposed service instances
    #[serde(default)]
    pub services: Vec<ServiceDef>,
}

fn default_name() -> String {
    "demo_device".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_banner() -> Vec<String> {
    vec!["resource monitor v2".to_string(), "ready".to_string()]
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            bind: default_bind(),
            port: 0,
            silent: false,
            banner: default_banner(),
            services: Vec::new(),
        }
    }
}

impl DeviceConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path))?;
        Ok(config)
    }

    /// Demo configuration: two dimmable leds and a momentary button
    pub fn demo() -> Self {
        Self {
            services: vec![
                ServiceDef {
                    name: "led_1".to_string(),
                    post_enabled: true,
                    range: RangeDef { min: 0, max: 255 },
                    initial: 0,
                },
                ServiceDef {
                    name: "led_2".to_string(),
                    post_enabled: true,
                    range: RangeDef { min: 0, max: 255 },
                    initial: 0,
                },
                ServiceDef {
                    name: "button_1".to_string(),
                    post_enabled: false,
                    range: RangeDef { min: 0, max: 1 },
                    initial: 0,
                },
            ],
            ..Self::default()
        }
    }
}

/// One exposed service instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDef {
    /// Instance name (e.g. `led_1`)
    pub name: String,

    /// Whether POST updates are accepted
    #[serde(default)]
    pub post_enabled: bool,

    /// Advertised value range
    #[serde(default)]
    pub range: RangeDef,

    /// Initial value
    #[serde(default)]
    pub initial: i64,
}

/// Advertised value range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeDef {
    /// Lower bound
    #[serde(default)]
    pub min: i64,
    /// Upper bound
    #[serde(default)]
    pub max: i64,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
name = "kitchen"
port = 9000

[[services]]
name = "led_1"
post_enabled = true
range = { min = 0, max = 255 }
"#;
        let config: DeviceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.name, "kitchen");
        assert_eq!(config.port, 9000);
        assert!(!config.silent);
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.services[0].range, RangeDef { min: 0, max: 255 });
        assert_eq!(config.services[0].initial, 0);
    }

    #[test]
    fn demo_config_has_post_enabled_leds() {
        let config = DeviceConfig::demo();
        assert_eq!(config.services.len(), 3);
        assert!(config.services.iter().any(|s| s.name == "led_1" && s.post_enabled));
        assert!(config.services.iter().any(|s| s.name == "button_1" && !s.post_enabled));
    }
}
