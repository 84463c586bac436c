//! Public request and sub-request models

use std::fmt;

use serde::{Deserialize, Serialize};

use super::device::DeviceId;

/// Identifier linking a public request (or discovery probe) to its
/// sub-requests and responses.
///
/// Client-triggered ids are positive and allocator-assigned; discovery
/// probes use the negated device id. Device ids are strictly positive, so
/// the two spaces never collide.
pub type CorrelationId = i64;

/// Request verb accepted at the public boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verb {
    /// Read resource state
    Get,
    /// Update resource state
    Post,
}

impl Verb {
    /// Parse a verb token; anything other than GET/POST is unsupported
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            _ => None,
        }
    }

    /// Wire spelling of the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A public request line split into its wire components.
///
/// The wire shape is `"<VERB> /<path><query>\n<body>"`. The body is the
/// final line of the raw request, which also tolerates browser-style
/// requests: header lines between the request line and the payload are
/// carried in neither `path` nor `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Request verb
    pub verb: Verb,
    /// Path with the leading `/` stripped, query excluded
    pub path: String,
    /// Query string including the leading `?`, or empty
    pub query: String,
    /// Final line of the raw request
    pub body: String,
}

impl RequestLine {
    /// Parse a raw public request. Returns `None` for anything that does
    /// not open with a supported verb and a `/`-rooted target.
    pub fn parse(raw: &str) -> Option<Self> {
        let first = raw.split('\n').next().unwrap_or("").trim_end_matches('\r');
        let (verb_token, rest) = first.split_once(' ')?;
        let verb = Verb::parse(verb_token)?;
        let target = rest.strip_prefix('/')?;
        let target = target.split_whitespace().next().unwrap_or("");
        let (path, query) = match target.find('?') {
            Some(at) => (&target[..at], &target[at..]),
            None => (target, ""),
        };
        let body = match raw.rsplit_once('\n') {
            Some((_, last)) => last.trim_end_matches('\r'),
            None => "",
        };
        Some(Self {
            verb,
            path: path.to_string(),
            query: query.to_string(),
            body: body.to_string(),
        })
    }

    /// Non-empty path segments
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Rebuild a request line with the path replaced by the given resource
    /// list, preserving the original query and body.
    pub fn rebuild(&self, resources: &[String]) -> String {
        format!(
            "{} /{}{}\n{}",
            self.verb,
            resources.join("/"),
            self.query,
            self.body
        )
    }
}

/// Network address of a registered device, carried by each sub-request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// Owning device id
    pub device_id: DeviceId,
    /// Device name
    pub name: String,
    /// Device IP address
    pub ip: String,
    /// Device TCP port
    pub port: u16,
}

/// One outbound call to one device, tagged with the owning correlation id.
/// Immutable value; created per dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRequest {
    /// Correlation id of the owning public request (negative for probes)
    pub correlation_id: CorrelationId,
    /// Complete request line sent to the device
    pub request_line: String,
    /// Target device address
    pub target: DeviceAddress,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_bare_get() {
        let parsed = RequestLine::parse("GET /").unwrap();
        assert_eq!(parsed.verb, Verb::Get);
        assert_eq!(parsed.path, "");
        assert_eq!(parsed.query, "");
        assert_eq!(parsed.body, "");
        assert!(parsed.segments().is_empty());
    }

    #[test]
    fn parse_path_query_and_body() {
        let parsed = RequestLine::parse("POST /livingroom/led_1?units=raw\nled_1=42").unwrap();
        assert_eq!(parsed.verb, Verb::Post);
        assert_eq!(parsed.path, "livingroom/led_1");
        assert_eq!(parsed.query, "?units=raw");
        assert_eq!(parsed.body, "led_1=42");
        assert_eq!(parsed.segments(), vec!["livingroom", "led_1"]);
    }

    #[test]
    fn parse_browser_style_request() {
        let raw = "POST /livingroom HTTP/1.1\r\nHost: gateway\r\nContent-Length: 8\r\n\r\nled_1=10";
        let parsed = RequestLine::parse(raw).unwrap();
        assert_eq!(parsed.path, "livingroom");
        assert_eq!(parsed.query, "");
        assert_eq!(parsed.body, "led_1=10");
    }

    #[test]
    fn parse_rejects_other_verbs() {
        assert_eq!(RequestLine::parse("PUT /led"), None);
        assert_eq!(RequestLine::parse("DELETE /"), None);
        assert_eq!(RequestLine::parse("garbage"), None);
    }

    #[test]
    fn parse_rejects_unrooted_target() {
        assert_eq!(RequestLine::parse("GET led"), None);
    }

    #[test]
    fn rebuild_preserves_query_and_body() {
        let parsed = RequestLine::parse("GET /kitchen/led?units=raw\n").unwrap();
        let resources = vec!["json".to_string(), "led_1".to_string()];
        assert_eq!(parsed.rebuild(&resources), "GET /json/led_1?units=raw\n");
    }
}
