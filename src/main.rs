//! App proxy gateway.
//!
//! Sits between a storefront platform's app proxy and a backend web
//! application so the backend can be embedded under a storefront subpath.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                  APP PROXY GATEWAY               │
//!                          │                                                  │
//!   Storefront request     │  ┌─────────┐   ┌───────────┐   ┌─────────────┐   │
//!  ────────────────────────┼─▶│  http   │──▶│ signature │──▶│   routing   │   │
//!                          │  │ server  │   │  verifier │   │ path/query  │   │
//!                          │  └─────────┘   └───────────┘   └──────┬──────┘   │
//!                          │                                       ▼          │
//!                          │                               ┌─────────────┐    │
//!                          │                               │  forwarder  │────┼──▶ Backend
//!                          │                               │  + headers  │◀───┼─── app
//!                          │                               └──────┬──────┘    │
//!   Response               │  ┌─────────┐   ┌───────────┐          │           │
//!  ◀───────────────────────┼──│response │◀──│  rewrite  │◀─────────┘           │
//!                          │  │  relay  │   │ strategy  │                      │
//!                          │  └─────────┘   └───────────┘                      │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use app_proxy_gateway::config::{load_config, Environment};
use app_proxy_gateway::lifecycle::{signals, Shutdown};
use app_proxy_gateway::observability::{logging, metrics};
use app_proxy_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "app-proxy-gateway")]
#[command(about = "Forwarding gateway for storefront app proxy routes", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!("app-proxy-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        target = %config.upstream.target_origin,
        route_prefix = %config.proxy.route_prefix,
        mode = config.proxy.mode.as_str(),
        environment = ?config.security.environment,
        timeout_secs = config.upstream.timeout_secs,
        "Configuration loaded"
    );

    if config.security.environment == Environment::Production && config.security.secret().is_none() {
        tracing::warn!("Running in production without a shared secret; signatures are NOT verified");
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
