//! Public TCP listener.
//!
//! One exchange per connection: read the raw request, register it with
//! the controller, await the mailbox for the correlated response, write
//! it back, close. The controller guarantees exactly one response per
//! registered request at or before its deadline; the guard timeout here
//! only protects the connection task if that contract is ever violated.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use resgw_gateway::{Controller, ResponseMailbox};

/// Upper bound on one raw public request
const MAX_REQUEST_BYTES: usize = 8192;

/// Safety net for the connection task
const RESPONSE_GUARD: Duration = Duration::from_secs(30);

/// Accept public connections until the controller's shutdown signal fires
pub async fn serve(
    listener: TcpListener,
    controller: Controller,
    mailbox: Arc<ResponseMailbox>,
) -> anyhow::Result<()> {
    let mut shutdown = controller.shutdown_signal();
    info!(addr = %listener.local_addr()?, "public listener ready");
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("public listener stopping");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                debug!(%peer, "public connection accepted");
                let controller = controller.clone();
                let mailbox = Arc::clone(&mailbox);
                tokio::spawn(async move {
                    if let Err(error) = handle_connection(stream, controller, mailbox).await {
                        debug!(%peer, %error, "public connection error");
                    }
                });
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    controller: Controller,
    mailbox: Arc<ResponseMailbox>,
) -> std::io::Result<()> {
    let mut buffer = vec![0u8; MAX_REQUEST_BYTES];
    let read = stream.read(&mut buffer).await?;
    if read == 0 {
        return Ok(());
    }
    let raw = String::from_utf8_lossy(&buffer[..read]).into_owned();

    let correlation_id = controller.register_public_request(&raw);
    let response = match tokio::time::timeout(RESPONSE_GUARD, mailbox.wait(correlation_id)).await {
        Ok(Some(response)) => response,
        Ok(None) | Err(_) => {
            warn!(correlation_id, "no response produced for public request");
            return Ok(());
        }
    };

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
