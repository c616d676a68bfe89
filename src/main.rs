//! CLI entry point for the DHM server.
//!
//! ```bash
//! # Serve on the default port with the simulated microscope
//! dhm-serv serve
//!
//! # Override the configured port
//! dhm-serv serve --config config/dhm-serv.toml --port 27183
//!
//! # Query a running server and print its parameters as JSON
//! dhm-serv status --addr 127.0.0.1:27182
//! ```

// Global allocator (Microsoft Rust Guidelines: M-MIMALLOC-APPS)
#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dhm_client::DhmClient;
use dhm_core::{GrabTimer, HardwareController, Microscope};
use dhm_driver_mock::MockDhm;
use dhm_serv::{config::Settings, logging, spawn_initializer, DhmServer, Dispatcher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[derive(Parser)]
#[command(name = "dhm-serv")]
#[command(about = "Remote-control server for a digital holographic microscope", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Configuration file (TOML format)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind address, overriding the configuration
        #[arg(long)]
        addr: Option<String>,

        /// TCP port, overriding the configuration
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the parameters of a running server as JSON
    Status {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:27182")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, addr, port } => serve(config, addr, port).await,
        Commands::Status { addr } => status(&addr).await,
    }
}

async fn serve(config: Option<PathBuf>, addr: Option<String>, port: Option<u16>) -> Result<()> {
    let mut settings = Settings::load(config.as_deref())?;
    if let Some(addr) = addr {
        settings.server.addr = addr;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    settings.validate()?;

    logging::init_from_settings(&settings).map_err(anyhow::Error::msg)?;
    info!("This is dhm-serv {}", env!("CARGO_PKG_VERSION"));

    let dhm = Arc::new(MockDhm::from_config(&settings.mock));
    info!(mode = ?dhm.mode(), "using simulated microscope");
    let hardware: Arc<dyn HardwareController> = dhm;

    let timer = GrabTimer::new(settings.hardware.settling_factor);
    let scope = Microscope::with_timer(hardware.clone(), timer);
    let init = spawn_initializer(hardware, settings.hardware.init_retry_delay());

    let bind_addr = settings.server.bind_addr()?;
    let server = DhmServer::bind(bind_addr, Dispatcher::new(scope))
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
        }
    };
    server.run_until(shutdown).await?;

    init.abort();
    Ok(())
}

async fn status(addr: &str) -> Result<()> {
    let mut client = DhmClient::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;
    let params = client.parameters().await?;
    client.quit().await?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}
