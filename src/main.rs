//! API gateway front end.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                      GATEWAY                          │
//!                     │                                                       │
//!  Client Request     │  ┌─────────┐    ┌─────────────┐    ┌──────────────┐  │
//!  ───────────────────┼─▶│  http   │───▶│   routing   │───▶│   gateway    │  │
//!                     │  │ server  │    │ route table │    │   dispatch   │  │
//!                     │  └─────────┘    └─────────────┘    └──────┬───────┘  │
//!                     │                                           │          │
//!                     │                                           ▼          │
//!                     │                                   ┌──────────────┐   │
//!                     │                                   │  invocation  │   │
//!                     │                                   │   context    │   │
//!                     │                                   └──────┬───────┘   │
//!                     │                                          ▼           │
//!  Client Response    │                                   ┌──────────────┐   │
//!  ◀──────────────────┼───────────────────────────────────│ integration  │   │
//!                     │                                   │  (registry)  │   │
//!                     │                                   └──────────────┘   │
//!                     │  config · observability · lifecycle                  │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use apigw_router::config::{load_config, GatewayConfig};
use apigw_router::lifecycle::signals::shutdown_on_signal;
use apigw_router::observability::{logging, metrics};
use apigw_router::{ApiRegistry, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "apigw-router")]
#[command(about = "API gateway front end for REST API invocations", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("apigw-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        apis = config.apis.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(ApiRegistry::from_configs(config.apis.clone()));
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(shutdown_on_signal(shutdown));

    let server = HttpServer::new(config, registry.clone(), registry)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
