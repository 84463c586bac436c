//! example-device - resource device simulator
//!
//! Simulates a small networked device for gateway development and
//! integration tests. The wire protocol is one exchange per connection:
//! the peer writes a request line (and optional body), half-closes, and
//! the device answers with a header block plus JSON body, then closes.
//!
//! `/resource_info` returns the discovery document; any other path reads
//! (or, for POST, updates) the named service values.

pub mod config;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

pub use config::{DeviceConfig, RangeDef, ServiceDef};

/// A simulated device with mutable service values
pub struct DeviceSim {
    config: DeviceConfig,
    values: Mutex<BTreeMap<String, i64>>,
}

impl DeviceSim {
    /// Create a simulator with every service at its initial value
    pub fn new(config: DeviceConfig) -> Arc<Self> {
        let values = config
            .services
            .iter()
            .map(|service| (service.name.clone(), service.initial))
            .collect();
        Arc::new(Self {
            config,
            values: Mutex::new(values),
        })
    }

    /// Device name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Current value of one service, if it exists
    pub fn value_of(&self, service: &str) -> Option<i64> {
        self.values.lock().get(service).copied()
    }

    /// Bind the configured address and serve connections in a background
    /// task. Returns the bound address (useful with port 0).
    pub async fn spawn(self: Arc<Self>) -> std::io::Result<SocketAddr> {
        let listener =
            TcpListener::bind((self.config.bind.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        info!(device = %self.config.name, %addr, "device simulator listening");

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _peer)) => {
                        let sim = Arc::clone(&self);
                        tokio::spawn(async move {
                            if let Err(error) = sim.handle_connection(stream).await {
                                debug!(device = %sim.config.name, %error, "connection error");
                            }
                        });
                    }
                    Err(error) => {
                        warn!(device = %self.config.name, %error, "accept failed");
                        break;
                    }
                }
            }
        });
        Ok(addr)
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> std::io::Result<()> {
        if self.config.silent {
            // hold the connection open without answering; closing it would
            // look like an empty response instead of a dead device
            debug!(device = %self.config.name, "silent mode, holding connection");
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            return Ok(());
        }

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        let request = String::from_utf8_lossy(&raw);
        let response = self.respond_to(&request);
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// Build the response for one raw request
    pub fn respond_to(&self, raw: &str) -> String {
        let first = raw.split('\n').next().unwrap_or("").trim_end_matches('\r');
        let mut tokens = first.split(' ');
        let verb = tokens.next().unwrap_or("");
        let target = tokens.next().unwrap_or("/");
        let path = target
            .trim_start_matches('/')
            .split('?')
            .next()
            .unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if segments.first() == Some(&"resource_info") {
            return self.discovery_document();
        }

        if verb == "POST" {
            let body = match raw.rsplit_once('\n') {
                Some((_, last)) => last.trim_end_matches('\r'),
                None => "",
            };
            self.apply_updates(body);
        }

        // resource names follow the data-format prefix; none means "all"
        let resources: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|segment| *segment != "json")
            .collect();
        self.state_document(&resources)
    }

    fn discovery_document(&self) -> String {
        let descriptors: Vec<serde_json::Value> = self
            .config
            .services
            .iter()
            .map(|service| {
                serde_json::json!({
                    "resource_name": service.name,
                    "post_enabled": service.post_enabled,
                    "range": {"min": service.range.min, "max": service.range.max},
                })
            })
            .collect();

        let mut response =
            String::from("HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n");
        for line in &self.config.banner {
            response.push_str(line);
            response.push('\n');
        }
        response.push_str(&serde_json::Value::Array(descriptors).to_string());
        response.push('\n');
        response
    }

    fn state_document(&self, resources: &[&str]) -> String {
        let values = self.values.lock();
        let mut state = serde_json::Map::new();
        if resources.is_empty() {
            for (name, value) in values.iter() {
                state.insert(name.clone(), (*value).into());
            }
        } else {
            for name in resources {
                if let Some(value) = values.get(*name) {
                    state.insert((*name).to_string(), (*value).into());
                }
            }
        }
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{}\n",
            serde_json::Value::Object(state)
        )
    }

    /// Apply `name=value&...` updates to post-enabled services, clamped
    /// to the advertised range
    fn apply_updates(&self, body: &str) {
        let mut values = self.values.lock();
        for pair in body.split('&') {
            let Some((name, raw_value)) = pair.split_once('=') else {
                continue;
            };
            let Ok(value) = raw_value.trim().parse::<i64>() else {
                continue;
            };
            let Some(service) = self
                .config
                .services
                .iter()
                .find(|s| s.name == name && s.post_enabled)
            else {
                continue;
            };
            let value = if service.range.min <= service.range.max {
                value.clamp(service.range.min, service.range.max)
            } else {
                value
            };
            debug!(device = %self.config.name, service = %name, value, "value updated");
            values.insert(name.to_string(), value);
        }
    }
}
