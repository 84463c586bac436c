//! resgw-client - TCP device transport.
//!
//! Devices speak a raw line protocol: the client connects, writes the
//! complete request line, half-closes its side, and reads the response
//! until the device closes the connection. Both phases run under their
//! own timeout so a wedged device cannot pin a dispatch task.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use resgw_core::{DeviceTransport, GatewayError, GatewayResult, SubRequest};

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Default write-and-read timeout for one exchange
const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Device transport over plain TCP
#[derive(Debug, Clone)]
pub struct TcpDeviceTransport {
    connect_timeout: Duration,
    exchange_timeout: Duration,
}

impl TcpDeviceTransport {
    /// Create a transport with the default timeouts
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_EXCHANGE_TIMEOUT)
    }

    /// Create a transport with custom timeouts
    pub fn with_timeouts(connect_timeout: Duration, exchange_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            exchange_timeout,
        }
    }
}

impl Default for TcpDeviceTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTransport for TcpDeviceTransport {
    async fn dispatch(&self, request: &SubRequest) -> GatewayResult<String> {
        let address = format!("{}:{}", request.target.ip, request.target.port);
        debug!(
            correlation_id = request.correlation_id,
            device = %request.target.name,
            %address,
            "dispatching sub-request"
        );

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| GatewayError::Transport(format!("connect timeout to {}", address)))?
            .map_err(|e| GatewayError::Transport(format!("connect to {}: {}", address, e)))?;

        let exchange = async {
            stream.write_all(request.request_line.as_bytes()).await?;
            // half-close so the device sees end-of-request
            stream.shutdown().await?;
            let mut body = Vec::new();
            stream.read_to_end(&mut body).await?;
            Ok::<Vec<u8>, std::io::Error>(body)
        };
        let body = timeout(self.exchange_timeout, exchange)
            .await
            .map_err(|_| GatewayError::Transport(format!("exchange timeout with {}", address)))?
            .map_err(|e| GatewayError::Transport(format!("exchange with {}: {}", address, e)))?;

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
