//! Device, service type, and service instance models

use serde::{Deserialize, Deserializer, Serialize};

use super::request::DeviceAddress;

/// Identifier of a registered device. Strictly positive: the discovery
/// protocol reserves the negated id as a probe correlation id.
pub type DeviceId = i64;

/// Identifier of a service type.
pub type ServiceTypeId = i64;

/// A networked resource endpoint identified by name, ip, and port.
/// Immutable once registered; owned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Catalog-assigned identifier
    pub id: DeviceId,
    /// Unique device name
    pub name: String,
    /// Device IP address
    pub ip: String,
    /// Device TCP port
    pub port: u16,
}

impl Device {
    /// The address carried by sub-requests targeting this device
    pub fn address(&self) -> DeviceAddress {
        DeviceAddress {
            device_id: self.id,
            name: self.name.clone(),
            ip: self.ip.clone(),
            port: self.port,
        }
    }
}

/// Canonical category of capability (e.g. `led`), derived by stripping the
/// numeric suffix from an instance name. Created lazily on first sight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceType {
    /// Catalog-assigned identifier
    pub id: ServiceTypeId,
    /// Canonical name, unique
    pub name: String,
}

/// One concrete capability exposed by one device (e.g. `led_2`).
/// Created in bulk when a device's discovery response is parsed; superseded
/// wholesale, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Instance name as reported by the device
    pub name: String,
    /// Owning device
    pub device_id: DeviceId,
    /// Resolved canonical type
    pub service_type_id: ServiceTypeId,
    /// Whether the device accepts POST updates for this instance
    pub post_enabled: bool,
    /// Lower bound of the value range
    pub range_min: i64,
    /// Upper bound of the value range
    pub range_max: i64,
}

/// Wire shape of one entry in a device's discovery document.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDescriptor {
    /// Instance name, optionally suffixed `_<digits>`
    pub resource_name: String,
    /// Whether POST updates are accepted
    #[serde(default, deserialize_with = "bool_or_string")]
    pub post_enabled: bool,
    /// Value range
    #[serde(default)]
    pub range: ServiceRange,
}

/// Value range advertised for a service instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceRange {
    /// Lower bound
    #[serde(default)]
    pub min: i64,
    /// Upper bound
    #[serde(default)]
    pub max: i64,
}

/// Device firmware emits `post_enabled` as a JSON bool or as the strings
/// `"true"`/`"false"`; accept both.
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Text(String),
    }

    Ok(match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => b,
        BoolOrString::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_with_bool_flag() {
        let descriptor: ServiceDescriptor = serde_json::from_str(
            r#"{"resource_name": "led_1", "post_enabled": true, "range": {"min": 0, "max": 255}}"#,
        )
        .unwrap();
        assert_eq!(descriptor.resource_name, "led_1");
        assert!(descriptor.post_enabled);
        assert_eq!(descriptor.range, ServiceRange { min: 0, max: 255 });
    }

    #[test]
    fn descriptor_with_string_flag() {
        let descriptor: ServiceDescriptor = serde_json::from_str(
            r#"{"resource_name": "button_1", "post_enabled": "false", "range": {"min": 0, "max": 1}}"#,
        )
        .unwrap();
        assert!(!descriptor.post_enabled);
    }

    #[test]
    fn descriptor_defaults() {
        let descriptor: ServiceDescriptor =
            serde_json::from_str(r#"{"resource_name": "relay_3"}"#).unwrap();
        assert!(!descriptor.post_enabled);
        assert_eq!(descriptor.range, ServiceRange::default());
    }

    #[test]
    fn device_address_carries_id() {
        let device = Device {
            id: 7,
            name: "porch".to_string(),
            ip: "10.0.0.7".to_string(),
            port: 8080,
        };
        let address = device.address();
        assert_eq!(address.device_id, 7);
        assert_eq!(address.name, "porch");
        assert_eq!(address.port, 8080);
    }
}
