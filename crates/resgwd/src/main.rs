//! resgwd - resource gateway daemon
//!
//! Public-facing gateway that fans each inbound request out to the
//! registered devices, correlates their answers, and replies with one
//! merged response.
//!
//! # Usage
//!
//! ```bash
//! # defaults: port 8080, no devices
//! resgwd
//!
//! # with a config file
//! resgwd config/resgwd.toml
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resgw_client::TcpDeviceTransport;
use resgw_core::{Catalog, PublicResponder};
use resgw_gateway::{Controller, ResponseMailbox, TokioScheduler};
use resgwd::config::GatewayConfig;
use resgwd::server;

#[derive(Parser, Debug)]
#[command(name = "resgwd")]
#[command(about = "Resource gateway daemon")]
struct Args {
    /// Configuration file path (TOML); defaults apply when omitted
    config: Option<String>,

    /// Listen port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "resgwd=debug,resgw_gateway=debug,resgw_client=debug"
    } else {
        "resgwd=info,resgw_gateway=info,resgw_client=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting resgwd");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!(path = %path, "loading configuration");
            GatewayConfig::load(path)?
        }
        None => {
            tracing::info!("no config file provided, using defaults");
            GatewayConfig::default()
        }
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let mailbox = Arc::new(ResponseMailbox::new());
    let responder: Arc<dyn PublicResponder> = mailbox.clone();
    let controller = Controller::with_config(
        Arc::new(Catalog::new()),
        Arc::new(TcpDeviceTransport::new()),
        responder,
        Arc::new(TokioScheduler),
        Duration::from_millis(config.server.response_timeout_ms),
    );

    // each successful registration kicks off a discovery probe
    for entry in &config.devices {
        if let Err(error) = controller.register_device(&entry.name, &entry.ip, entry.port) {
            tracing::warn!(name = %entry.name, %error, "skipping device entry");
        }
    }
    if config.devices.is_empty() {
        tracing::warn!("no devices configured; every request will resolve to not found");
    }

    let listener = TcpListener::bind((config.server.bind.as_str(), config.server.port)).await?;
    let serve_task = tokio::spawn(server::serve(listener, controller.clone(), mailbox));

    tokio::signal::ctrl_c().await?;
    controller.shutdown();
    serve_task.await??;
    Ok(())
}
