//! Shared harness for end-to-end gateway tests.
//!
//! Runs the full stack in-process: device simulators, the controller with
//! the real TCP transport and tokio scheduler, and the public listener,
//! all on ephemeral loopback ports, so tests are parallel-safe and need
//! no external setup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use example_device::{DeviceConfig, DeviceSim};
use resgw_client::TcpDeviceTransport;
use resgw_core::{Catalog, PublicResponder};
use resgw_gateway::{Controller, ResponseMailbox, TokioScheduler};

/// Response deadline used by the test gateway; simulators answer on
/// loopback well inside this
pub const TEST_RESPONSE_TIMEOUT: Duration = Duration::from_millis(400);

/// A full in-process gateway stack
pub struct GatewayHarness {
    /// The engine under test
    pub controller: Controller,
    /// Address of the public listener
    pub public_addr: SocketAddr,
}

impl GatewayHarness {
    /// Start the controller and the public listener
    pub async fn start() -> anyhow::Result<Self> {
        let mailbox = Arc::new(ResponseMailbox::new());
        let responder: Arc<dyn PublicResponder> = mailbox.clone();
        let controller = Controller::with_config(
            Arc::new(Catalog::new()),
            Arc::new(TcpDeviceTransport::with_timeouts(
                Duration::from_millis(200),
                Duration::from_millis(200),
            )),
            responder,
            Arc::new(TokioScheduler),
            TEST_RESPONSE_TIMEOUT,
        );

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let public_addr = listener.local_addr()?;
        tokio::spawn(resgwd::server::serve(
            listener,
            controller.clone(),
            mailbox,
        ));

        Ok(Self {
            controller,
            public_addr,
        })
    }

    /// Spawn a simulator, register it with the gateway, and (unless the
    /// device is silent) wait for its discovery probe to complete
    pub async fn add_device(&self, config: DeviceConfig) -> anyhow::Result<Arc<DeviceSim>> {
        let name = config.name.clone();
        let silent = config.silent;
        let sim = DeviceSim::new(config);
        let addr = Arc::clone(&sim).spawn().await?;
        self.controller
            .register_device(&name, "127.0.0.1", addr.port())?;
        if !silent {
            wait_for_discovery(&self.controller, &name).await;
        }
        Ok(sim)
    }

    /// Issue one raw public request and return the raw response
    pub async fn request(&self, raw: &str) -> anyhow::Result<String> {
        let mut stream = TcpStream::connect(self.public_addr).await?;
        stream.write_all(raw.as_bytes()).await?;
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

/// Poll until the device's instances appear in the catalog; gives up
/// after a second so a broken probe fails the test instead of hanging it
pub async fn wait_for_discovery(controller: &Controller, device_name: &str) {
    for _ in 0..100 {
        if let Some(device) = controller.catalog().find_device_by_name(device_name) {
            if !controller.catalog().instances_by_device(device.id).is_empty() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Demo device config (two leds, one button) with a custom name on an
/// ephemeral port
pub fn demo_device(name: &str) -> DeviceConfig {
    DeviceConfig {
        name: name.to_string(),
        ..DeviceConfig::demo()
    }
}

/// A device that accepts connections but never answers
pub fn silent_device(name: &str) -> DeviceConfig {
    DeviceConfig {
        silent: true,
        ..demo_device(name)
    }
}
