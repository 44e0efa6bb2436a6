//! edge-node
//!
//! An HTTP edge node built with Tokio and Axum: one listener fronting a
//! static file tree and a pool of upstream HTTP servers.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                      EDGE NODE                       │
//!                    │                                                      │
//!  Client Request    │  ┌─────────┐   ┌────────────┐   ┌──────────────┐     │
//!  ──────────────────┼─▶│   net   │──▶│ rate limit │──▶│   routing    │     │
//!                    │  │listener │   │ (security) │   │    table     │     │
//!                    │  └─────────┘   └────────────┘   └──────┬───────┘     │
//!                    │                                       │             │
//!                    │                ┌───────────┬──────────┼──────────┐  │
//!                    │                ▼           ▼          ▼          ▼  │
//!                    │            /healthz    /static/    /proxy/    index  │
//!                    │                        ServeDir    round robin       │
//!                    │                                    ──────────────────┼──▶ Upstreams
//!                    │                                                      │
//!                    │  Cross-cutting: config, observability, lifecycle     │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use edge_node::config::Cli;
use edge_node::lifecycle::{signals, Shutdown};
use edge_node::observability::{logging, metrics};
use edge_node::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().load()?;

    logging::init_logging(&config.observability.log_filter);
    tracing::info!("edge-node v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        proxy_prefix = %config.proxy.prefix,
        static_dir = %config.static_files.dir,
        requests_per_second = config.rate_limit.requests_per_second,
        burst_size = config.rate_limit.burst_size,
        "Configuration loaded"
    );

    if !config.observability.metrics_address.is_empty() {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (server, listener) = HttpServer::bind(config).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(signals::watch(shutdown.clone()));

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
