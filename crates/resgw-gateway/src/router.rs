//! Request router: classifies a public request and computes the
//! sub-requests to dispatch, or synthesizes an immediate answer.
//!
//! Classification runs in priority order: empty path (broadcast), the
//! reserved form token, a leading device name (device-scoped), and
//! finally service names resolved across all devices.

use std::collections::BTreeMap;

use resgw_core::{Catalog, CorrelationId, Device, DeviceId, RequestLine, SubRequest};

/// Canonical data-format prefix every device resource list opens with
pub const DATA_FORMAT_PREFIX: &str = "json";

/// Reserved path segment that requests the synthesized control-form page
pub const FORM_TOKEN: &str = "form";

/// Routing outcome for one public request
#[derive(Debug)]
pub enum Route {
    /// Dispatch the given sub-requests and aggregate their responses.
    /// May be empty (unknown names, empty catalog); the deadline then
    /// resolves the request to the not-found outcome.
    Dispatch(Vec<SubRequest>),
    /// Answer immediately with a synthesized HTML document; nothing is
    /// dispatched and no deadline applies
    Form(String),
}

/// Classify a public request and build its sub-requests
pub fn route(catalog: &Catalog, correlation_id: CorrelationId, request: &RequestLine) -> Route {
    let segments = request.segments();

    if segments.is_empty() {
        return Route::Dispatch(broadcast(catalog, correlation_id, request));
    }
    if segments.iter().any(|s| *s == FORM_TOKEN) {
        return Route::Form(form_document(catalog));
    }
    if let Some(device) = catalog.find_device_by_name(segments[0]) {
        return Route::Dispatch(device_scoped(
            catalog,
            correlation_id,
            request,
            &device,
            &segments[1..],
        ));
    }
    Route::Dispatch(cross_device(catalog, correlation_id, request, &segments))
}

fn sub_request(
    correlation_id: CorrelationId,
    request: &RequestLine,
    resources: &[String],
    device: &Device,
) -> SubRequest {
    SubRequest {
        correlation_id,
        request_line: request.rebuild(resources),
        target: device.address(),
    }
}

/// Empty path: one sub-request per known device, resource list fixed to
/// the data-format prefix
fn broadcast(
    catalog: &Catalog,
    correlation_id: CorrelationId,
    request: &RequestLine,
) -> Vec<SubRequest> {
    let resources = vec![DATA_FORMAT_PREFIX.to_string()];
    catalog
        .all_devices()
        .iter()
        .map(|device| sub_request(correlation_id, request, &resources, device))
        .collect()
}

/// Leading segment names a device: remaining segments resolve against that
/// device's instances and the known service types. Exactly one sub-request.
fn device_scoped(
    catalog: &Catalog,
    correlation_id: CorrelationId,
    request: &RequestLine,
    device: &Device,
    resource_segments: &[&str],
) -> Vec<SubRequest> {
    let instances = catalog.instances_by_device(device.id);
    let mut resources = vec![DATA_FORMAT_PREFIX.to_string()];
    for segment in resource_segments {
        if instances.iter().any(|i| i.name == *segment) {
            resources.push((*segment).to_string());
        }
        if let Some(service_type) = catalog.find_service_type_by_name(segment) {
            for instance in instances
                .iter()
                .filter(|i| i.service_type_id == service_type.id)
            {
                resources.push(instance.name.clone());
            }
        }
    }
    dedupe(&mut resources);
    vec![sub_request(correlation_id, request, &resources, device)]
}

/// No device prefix: segments resolve as instance and service-type names
/// across all devices, matches grouped by owning device. One sub-request
/// per device with at least one match, in device-id order.
fn cross_device(
    catalog: &Catalog,
    correlation_id: CorrelationId,
    request: &RequestLine,
    segments: &[&str],
) -> Vec<SubRequest> {
    let mut by_device: BTreeMap<DeviceId, Vec<String>> = BTreeMap::new();
    for segment in segments {
        for instance in catalog.instances_by_name(segment) {
            by_device
                .entry(instance.device_id)
                .or_default()
                .push(instance.name);
        }
        if let Some(service_type) = catalog.find_service_type_by_name(segment) {
            for instance in catalog.instances_by_service_type(service_type.id) {
                by_device
                    .entry(instance.device_id)
                    .or_default()
                    .push(instance.name);
            }
        }
    }

    let mut requests = Vec::with_capacity(by_device.len());
    for (device_id, names) in by_device {
        let Some(device) = catalog.find_device_by_id(device_id) else {
            continue;
        };
        let mut resources = vec![DATA_FORMAT_PREFIX.to_string()];
        resources.extend(names);
        dedupe(&mut resources);
        requests.push(sub_request(correlation_id, request, &resources, &device));
    }
    requests
}

/// First-encounter-order dedupe; resource lists are small
fn dedupe(resources: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(resources.len());
    resources.retain(|resource| {
        if seen.contains(resource) {
            false
        } else {
            seen.push(resource.clone());
            true
        }
    });
}

/// Synthesize the control-form page from the catalog: one POST form per
/// device (in id order), one text input per post-enabled service instance
/// of that device.
pub fn form_document(catalog: &Catalog) -> String {
    let mut forms: BTreeMap<DeviceId, String> = BTreeMap::new();
    for device in catalog.all_devices() {
        forms.insert(
            device.id,
            format!(
                "<form style='display:inline;' action='/{}' method='POST'>",
                device.name
            ),
        );
    }
    for instance in catalog.instances_by_post_enabled(true) {
        if let Some(form) = forms.get_mut(&instance.device_id) {
            form.push_str(&format!(
                "{name}: <input type='text' name='{name}'/><br />",
                name = instance.name
            ));
        }
    }

    let mut document = String::new();
    for form in forms.values() {
        document.push_str(form);
        document.push_str("<input type='submit' value='update state'/></form><br/>");
    }
    document
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use resgw_core::ServiceInstance;

    use super::*;

    fn catalog_with_two_devices() -> Catalog {
        let catalog = Catalog::new();
        let kitchen = catalog.add_device("kitchen", "10.0.0.1", 8080).unwrap();
        let porch = catalog.add_device("porch", "10.0.0.2", 8080).unwrap();
        let led = catalog.get_or_create_service_type("led");
        let button = catalog.get_or_create_service_type("button");
        for (name, device_id, type_id, post) in [
            ("led_1", kitchen.id, led.id, true),
            ("led_2", kitchen.id, led.id, true),
            ("button_1", kitchen.id, button.id, false),
            ("led_1", porch.id, led.id, true),
        ] {
            catalog.add_service_instance(ServiceInstance {
                name: name.to_string(),
                device_id,
                service_type_id: type_id,
                post_enabled: post,
                range_min: 0,
                range_max: 255,
            });
        }
        catalog
    }

    fn parse(raw: &str) -> RequestLine {
        RequestLine::parse(raw).unwrap()
    }

    fn dispatched(route: Route) -> Vec<SubRequest> {
        match route {
            Route::Dispatch(requests) => requests,
            Route::Form(_) => panic!("expected dispatch route"),
        }
    }

    #[test]
    fn empty_path_broadcasts_to_every_device() {
        let catalog = catalog_with_two_devices();
        let requests = dispatched(route(&catalog, 10, &parse("GET /")));
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].target.name, "kitchen");
        assert_eq!(requests[0].request_line, "GET /json\n");
        assert_eq!(requests[1].target.name, "porch");
        assert_eq!(requests[1].correlation_id, 10);
    }

    #[test]
    fn broadcast_keeps_query_and_body() {
        let catalog = catalog_with_two_devices();
        let requests = dispatched(route(&catalog, 11, &parse("POST /?units=raw\nled_1=5")));
        assert_eq!(requests[0].request_line, "POST /json?units=raw\nled_1=5");
    }

    #[test]
    fn device_scoped_resolves_instance_names() {
        let catalog = catalog_with_two_devices();
        let requests = dispatched(route(&catalog, 12, &parse("GET /kitchen/led_1")));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target.name, "kitchen");
        assert_eq!(requests[0].request_line, "GET /json/led_1\n");
    }

    #[test]
    fn device_scoped_expands_service_types() {
        let catalog = catalog_with_two_devices();
        let requests = dispatched(route(&catalog, 13, &parse("GET /kitchen/led")));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].request_line, "GET /json/led_1/led_2\n");
    }

    #[test]
    fn device_scoped_dedupes_resources() {
        let catalog = catalog_with_two_devices();
        // led_1 arrives both as an instance name and through the type expansion
        let requests = dispatched(route(&catalog, 14, &parse("GET /kitchen/led_1/led")));
        assert_eq!(requests[0].request_line, "GET /json/led_1/led_2\n");
    }

    #[test]
    fn device_scoped_ignores_unknown_resources() {
        let catalog = catalog_with_two_devices();
        let requests = dispatched(route(&catalog, 15, &parse("GET /kitchen/thermostat")));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].request_line, "GET /json\n");
    }

    #[test]
    fn cross_device_groups_by_owner() {
        let catalog = catalog_with_two_devices();
        let requests = dispatched(route(&catalog, 16, &parse("GET /led")));
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].target.name, "kitchen");
        assert_eq!(requests[0].request_line, "GET /json/led_1/led_2\n");
        assert_eq!(requests[1].target.name, "porch");
        assert_eq!(requests[1].request_line, "GET /json/led_1\n");
    }

    #[test]
    fn cross_device_instance_name_only_matches_owners() {
        let catalog = catalog_with_two_devices();
        let requests = dispatched(route(&catalog, 17, &parse("GET /button_1")));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target.name, "kitchen");
        assert_eq!(requests[0].request_line, "GET /json/button_1\n");
    }

    #[test]
    fn unknown_names_dispatch_nothing() {
        let catalog = catalog_with_two_devices();
        let requests = dispatched(route(&catalog, 18, &parse("GET /thermostat")));
        assert!(requests.is_empty());
    }

    #[test]
    fn empty_catalog_broadcast_is_empty() {
        let catalog = Catalog::new();
        let requests = dispatched(route(&catalog, 19, &parse("GET /")));
        assert!(requests.is_empty());
    }

    #[test]
    fn form_token_synthesizes_page() {
        let catalog = catalog_with_two_devices();
        let Route::Form(document) = route(&catalog, 20, &parse("GET /form")) else {
            panic!("expected form route");
        };
        assert!(document.contains("action='/kitchen'"));
        assert!(document.contains("action='/porch'"));
        assert!(document.contains("name='led_1'"));
        assert!(document.contains("name='led_2'"));
        // button_1 is not post-enabled, so it gets no input field
        assert!(!document.contains("name='button_1'"));
        assert_eq!(document.matches("<form ").count(), 2);
        assert_eq!(document.matches("type='submit'").count(), 2);
    }

    #[test]
    fn form_page_for_empty_catalog_is_empty() {
        let catalog = Catalog::new();
        let Route::Form(document) = route(&catalog, 21, &parse("GET /form")) else {
            panic!("expected form route");
        };
        assert!(document.is_empty());
    }
}
