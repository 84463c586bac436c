//! In-memory registry of devices, service types, and service instances.
//!
//! The catalog is a pure runtime cache, rebuilt from live discovery: it
//! only grows within a process lifetime, except that one device's service
//! instances are superseded wholesale when a fresh discovery response for
//! that device is parsed. Lookups never fail: "no match" is a normal,
//! non-exceptional outcome reported as `None` or an empty `Vec`.

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{Device, DeviceId, ServiceInstance, ServiceType, ServiceTypeId};

/// Owned, lock-guarded device/service tables
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    devices: Vec<Device>,
    service_types: Vec<ServiceType>,
    instances: Vec<ServiceInstance>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device. Names are unique; re-registration is rejected
    /// with `DuplicateDevice`. Name and address validity is checked by the
    /// caller before insertion.
    pub fn add_device(&self, name: &str, ip: &str, port: u16) -> GatewayResult<Device> {
        let mut tables = self.tables.write();
        if tables.devices.iter().any(|d| d.name == name) {
            return Err(GatewayError::DuplicateDevice(name.to_string()));
        }
        let device = Device {
            id: tables.devices.len() as DeviceId + 1,
            name: name.to_string(),
            ip: ip.to_string(),
            port,
        };
        tables.devices.push(device.clone());
        debug!(device = %device.name, device_id = device.id, "device added to catalog");
        Ok(device)
    }

    /// Look up a device by its unique name
    pub fn find_device_by_name(&self, name: &str) -> Option<Device> {
        self.tables
            .read()
            .devices
            .iter()
            .find(|d| d.name == name)
            .cloned()
    }

    /// Look up a device by id
    pub fn find_device_by_id(&self, id: DeviceId) -> Option<Device> {
        self.tables
            .read()
            .devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    /// All registered devices, in registration (= id) order
    pub fn all_devices(&self) -> Vec<Device> {
        self.tables.read().devices.clone()
    }

    /// Resolve a service type by canonical name, creating it on first sight
    pub fn get_or_create_service_type(&self, canonical_name: &str) -> ServiceType {
        let mut tables = self.tables.write();
        if let Some(existing) = tables
            .service_types
            .iter()
            .find(|t| t.name == canonical_name)
        {
            return existing.clone();
        }
        let service_type = ServiceType {
            id: tables.service_types.len() as ServiceTypeId + 1,
            name: canonical_name.to_string(),
        };
        tables.service_types.push(service_type.clone());
        debug!(service_type = %service_type.name, type_id = service_type.id, "service type created");
        service_type
    }

    /// Look up a service type by canonical name
    pub fn find_service_type_by_name(&self, name: &str) -> Option<ServiceType> {
        self.tables
            .read()
            .service_types
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }

    /// Insert one service instance
    pub fn add_service_instance(&self, instance: ServiceInstance) {
        self.tables.write().instances.push(instance);
    }

    /// Supersede a device's instances with the set parsed from a fresh
    /// discovery response. Instances are replaced wholesale, never merged.
    pub fn replace_device_instances(&self, device_id: DeviceId, instances: Vec<ServiceInstance>) {
        let mut tables = self.tables.write();
        tables.instances.retain(|i| i.device_id != device_id);
        tables.instances.extend(instances);
    }

    /// All instances owned by one device
    pub fn instances_by_device(&self, device_id: DeviceId) -> Vec<ServiceInstance> {
        self.tables
            .read()
            .instances
            .iter()
            .filter(|i| i.device_id == device_id)
            .cloned()
            .collect()
    }

    /// All instances with the given name, across devices
    pub fn instances_by_name(&self, name: &str) -> Vec<ServiceInstance> {
        self.tables
            .read()
            .instances
            .iter()
            .filter(|i| i.name == name)
            .cloned()
            .collect()
    }

    /// All instances of one service type, across devices
    pub fn instances_by_service_type(&self, type_id: ServiceTypeId) -> Vec<ServiceInstance> {
        self.tables
            .read()
            .instances
            .iter()
            .filter(|i| i.service_type_id == type_id)
            .cloned()
            .collect()
    }

    /// All instances with the given POST capability
    pub fn instances_by_post_enabled(&self, enabled: bool) -> Vec<ServiceInstance> {
        self.tables
            .read()
            .instances
            .iter()
            .filter(|i| i.post_enabled == enabled)
            .cloned()
            .collect()
    }
}
