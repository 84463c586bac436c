//! example-device - standalone resource device simulator
//!
//! # Usage
//!
//! Demo device (two leds, one button) on an ephemeral port:
//! ```bash
//! ./example-device
//! ```
//!
//! With a config file:
//! ```bash
//! ./example-device --config config/demo-device.toml --port 9001
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use example_device::{DeviceConfig, DeviceSim};

#[derive(Parser, Debug)]
#[command(name = "example-device")]
#[command(about = "Resource device simulator for gateway development")]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Listen port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Device name (overrides config)
    #[arg(short, long)]
    name: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "example_device=debug"
    } else {
        "example_device=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => DeviceConfig::load(path)?,
        None => DeviceConfig::demo(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(name) = args.name {
        config.name = name;
    }

    let sim = DeviceSim::new(config);
    sim.spawn().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
