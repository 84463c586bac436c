//! End-to-end tests over real sockets: device simulators, discovery, the
//! public listener, fan-out, aggregation, and the timeout policy, all
//! in-process on ephemeral loopback ports.

use resgw_tests::{demo_device, silent_device, GatewayHarness};

#[tokio::test]
async fn discovery_builds_the_catalog_from_live_probes() {
    let harness = GatewayHarness::start().await.unwrap();
    harness.add_device(demo_device("kitchen")).await.unwrap();

    let catalog = harness.controller.catalog();
    let device = catalog.find_device_by_name("kitchen").unwrap();
    let led = catalog.find_service_type_by_name("led").unwrap();
    let button = catalog.find_service_type_by_name("button").unwrap();
    assert_eq!(catalog.instances_by_service_type(led.id).len(), 2);
    assert_eq!(catalog.instances_by_service_type(button.id).len(), 1);
    assert_eq!(catalog.instances_by_device(device.id).len(), 3);
}

#[tokio::test]
async fn broadcast_merges_every_device() {
    let harness = GatewayHarness::start().await.unwrap();
    harness.add_device(demo_device("kitchen")).await.unwrap();
    harness.add_device(demo_device("porch")).await.unwrap();

    let response = harness.request("GET /\n").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("\"kitchen\":"));
    assert!(response.contains("\"porch\":"));
    assert!(response.contains("\"led_1\":0"));
}

#[tokio::test]
async fn device_scoped_request_reads_one_device() {
    let harness = GatewayHarness::start().await.unwrap();
    harness.add_device(demo_device("kitchen")).await.unwrap();
    harness.add_device(demo_device("porch")).await.unwrap();

    let response = harness.request("GET /kitchen/led_1\n").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("\"kitchen\":"));
    assert!(!response.contains("\"porch\":"));
    assert!(response.contains("\"led_1\":0"));
    assert!(!response.contains("\"led_2\""));
}

#[tokio::test]
async fn cross_device_type_request_fans_out() {
    let harness = GatewayHarness::start().await.unwrap();
    harness.add_device(demo_device("kitchen")).await.unwrap();
    harness.add_device(demo_device("porch")).await.unwrap();

    let response = harness.request("GET /led\n").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("\"kitchen\":"));
    assert!(response.contains("\"porch\":"));
    // led values only; the button does not belong to the led type
    assert!(!response.contains("\"button_1\""));
}

#[tokio::test]
async fn post_updates_device_state() {
    let harness = GatewayHarness::start().await.unwrap();
    let kitchen = harness.add_device(demo_device("kitchen")).await.unwrap();

    let response = harness
        .request("POST /kitchen/led_1\nled_1=42")
        .await
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(kitchen.value_of("led_1"), Some(42));

    let read_back = harness.request("GET /kitchen/led_1\n").await.unwrap();
    assert!(read_back.contains("\"led_1\":42"));
}

#[tokio::test]
async fn silent_device_is_omitted_from_the_merge() {
    let harness = GatewayHarness::start().await.unwrap();
    harness.add_device(demo_device("kitchen")).await.unwrap();
    harness.add_device(silent_device("cellar")).await.unwrap();

    let response = harness.request("GET /\n").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("\"kitchen\":"));
    assert!(!response.contains("\"cellar\""));
}

#[tokio::test]
async fn unknown_service_resolves_to_not_found() {
    let harness = GatewayHarness::start().await.unwrap();
    harness.add_device(demo_device("kitchen")).await.unwrap();

    let response = harness.request("GET /thermostat\n").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 404 Not Found"));
    assert!(response.ends_with("Resources Not Found"));
}

#[tokio::test]
async fn empty_catalog_resolves_to_not_found() {
    let harness = GatewayHarness::start().await.unwrap();

    let response = harness.request("GET /\n").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 404 Not Found"));
}

#[tokio::test]
async fn form_page_lists_post_enabled_services() {
    let harness = GatewayHarness::start().await.unwrap();
    harness.add_device(demo_device("kitchen")).await.unwrap();

    let response = harness.request("GET /form\n").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("Content-Type: text/html"));
    assert!(response.contains("action='/kitchen'"));
    assert!(response.contains("name='led_1'"));
    assert!(!response.contains("name='button_1'"));
}

#[tokio::test]
async fn unsupported_verb_is_rejected() {
    let harness = GatewayHarness::start().await.unwrap();
    harness.add_device(demo_device("kitchen")).await.unwrap();

    let response = harness.request("PUT /kitchen/led_1\n").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 501 Not Implemented"));
}

#[tokio::test]
async fn browser_style_request_is_served() {
    let harness = GatewayHarness::start().await.unwrap();
    let kitchen = harness.add_device(demo_device("kitchen")).await.unwrap();

    let raw = "POST /kitchen/led_2 HTTP/1.1\r\nHost: gateway\r\nContent-Length: 9\r\n\r\nled_2=200";
    let response = harness.request(raw).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(kitchen.value_of("led_2"), Some(200));
}
