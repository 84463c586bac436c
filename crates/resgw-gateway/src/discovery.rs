//! Discovery protocol: bootstraps the runtime service catalog from live
//! probe responses.
//!
//! Every newly registered device is probed once with the reserved
//! `/resource_info` request. The probe travels through the normal
//! correlation machinery, keyed by the negated device id so the arriving
//! response is recognizable as a discovery response.

use tracing::{debug, warn};

use resgw_core::{
    scan, Catalog, Device, DeviceAddress, ServiceDescriptor, ServiceInstance, SubRequest,
};

/// Reserved request line probed at registration time
pub const PROBE_REQUEST_LINE: &str = "GET /resource_info";

/// Build the discovery probe for a newly registered device. The negated
/// device id doubles as the correlation id; device ids are positive, so
/// probe ids never collide with client-assigned ones.
pub fn probe_request(device: &Device) -> SubRequest {
    SubRequest {
        correlation_id: -device.id,
        request_line: PROBE_REQUEST_LINE.to_string(),
        target: device.address(),
    }
}

/// Parse a probe response body and populate the catalog.
///
/// The body is free text with one JSON array (or single object) of service
/// descriptors embedded after an optional banner preamble. Descriptors
/// that do not deserialize, or whose name has no canonical type form, are
/// skipped. Returns the number of instances registered; zero is a valid,
/// non-fatal outcome.
pub fn register_services(catalog: &Catalog, device: &DeviceAddress, body: &str) -> usize {
    let Some(raw_value) = scan::first_json_value(body) else {
        warn!(device = %device.name, "no structured value in discovery response");
        return 0;
    };
    let value: serde_json::Value = match serde_json::from_str(raw_value) {
        Ok(value) => value,
        Err(error) => {
            warn!(device = %device.name, %error, "discovery response is not valid JSON");
            return 0;
        }
    };
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        object @ serde_json::Value::Object(_) => vec![object],
        _ => {
            warn!(device = %device.name, "discovery response is not an array or object");
            return 0;
        }
    };

    let mut instances = Vec::with_capacity(entries.len());
    for entry in entries {
        let descriptor: ServiceDescriptor = match serde_json::from_value(entry) {
            Ok(descriptor) => descriptor,
            Err(error) => {
                debug!(device = %device.name, %error, "skipping malformed service descriptor");
                continue;
            }
        };
        let Some(canonical) = scan::canonical_type_name(&descriptor.resource_name) else {
            debug!(
                device = %device.name,
                resource = %descriptor.resource_name,
                "skipping descriptor without canonical type name"
            );
            continue;
        };
        let service_type = catalog.get_or_create_service_type(canonical);
        instances.push(ServiceInstance {
            name: descriptor.resource_name.clone(),
            device_id: device.device_id,
            service_type_id: service_type.id,
            post_enabled: descriptor.post_enabled,
            range_min: descriptor.range.min,
            range_max: descriptor.range.max,
        });
    }

    let count = instances.len();
    catalog.replace_device_instances(device.device_id, instances);
    count
}
