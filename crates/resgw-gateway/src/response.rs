//! Public response builders.
//!
//! The public surface is a preformatted byte protocol: every response is a
//! complete header block plus body, built here and written verbatim by the
//! listener. Merged bodies are one JSON array of per-device fragments.

use std::collections::BTreeMap;

use resgw_core::scan;

/// Merge the collected sub-responses into the public success response.
///
/// Each device contributes the first balanced JSON value found in its raw
/// body, wrapped as `{"<device>": <value>}`. A body with no extractable
/// value still yields a fragment with a `null` inner value, so the device
/// stays visible to the client. Devices appear in name order.
pub fn merged(responses: &BTreeMap<String, String>) -> String {
    let fragments: Vec<String> = responses
        .iter()
        .map(|(device, body)| {
            let value = scan::first_json_value(body).unwrap_or("null");
            format!("{{\r\n\"{}\": {}\r\n}}", device, value)
        })
        .collect();

    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n[\r\n{}\r\n]",
        fragments.join(",\r\n")
    )
}

/// Response when no sub-responses arrived before the deadline
pub fn not_found() -> String {
    "HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\n\r\nResources Not Found"
        .to_string()
}

/// Response for public requests that are not GET or POST
pub fn unsupported() -> String {
    "HTTP/1.1 501 Not Implemented\r\nContent-Type: application/json\r\n\r\n\
     {\"error\": \"request not supported, use GET or POST\"}"
        .to_string()
}

/// Wrap the synthesized control-form document
pub fn form_page(document: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n{}",
        document
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn collected(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(device, body)| (device.to_string(), body.to_string()))
            .collect()
    }

    #[test]
    fn merged_wraps_each_device_fragment() {
        let responses = collected(&[
            ("kitchen", "HTTP/1.1 200 OK\r\n\r\n{\"led_1\": 42}"),
            ("porch", "{\"led_1\": 7}"),
        ]);
        let response = merged(&responses);
        assert!(response.starts_with("HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n"));
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n[\r\n\
             {\r\n\"kitchen\": {\"led_1\": 42}\r\n},\r\n\
             {\r\n\"porch\": {\"led_1\": 7}\r\n}\r\n]"
        );
    }

    #[test]
    fn device_without_extractable_value_becomes_null() {
        let responses = collected(&[("kitchen", "device rebooting, come back later")]);
        let response = merged(&responses);
        assert!(response.contains("{\r\n\"kitchen\": null\r\n}"));
    }

    #[test]
    fn not_found_body_is_literal() {
        let response = not_found();
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("Resources Not Found"));
    }

    #[test]
    fn unsupported_is_distinct_from_not_found() {
        assert!(unsupported().starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        assert_ne!(unsupported(), not_found());
    }

    #[test]
    fn form_page_is_html() {
        let response = form_page("<form></form>");
        assert!(response.contains("Content-Type: text/html"));
        assert!(response.ends_with("<form></form>"));
    }
}
