//! # Consent-Exchange Client Node
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`CX_LOG`, `CX_LOG_FORMAT`)
//! 2. Load configuration (`--config` or `CX_CONFIG`, then env overrides)
//! 3. Build the key store, pin configured counterparties
//! 4. Serve `/proxy/v1/*`, `/v1/identity` and `/health` until Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cx_01_key_store::HttpIdentityFetcher;
use cx_03_client_node::ClientNodeService;
use node_runtime::{init_logging, load_config, LogFormat, NodeArgs};
use shared_types::SystemClock;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = NodeArgs::parse();

    let format = LogFormat::from_env_value(std::env::var(node_runtime::logging::LOG_FORMAT_ENV).ok().as_deref());
    init_logging(format).context("failed to initialize logging")?;

    let config = load_config(&args.config, |key| std::env::var(key).ok())?;

    let client = reqwest::Client::builder()
        .timeout(config.key_store.fetch_timeout)
        .build()
        .context("failed to build HTTP client")?;
    let fetcher = if config.key_store.insecure_http {
        warn!("Fetching identity documents over plain http");
        HttpIdentityFetcher::insecure(client)
    } else {
        HttpIdentityFetcher::new(client)
    };

    let mut service = ClientNodeService::new(config, Arc::new(fetcher), Arc::new(SystemClock))
        .context("failed to initialize client node")?;

    info!(
        version = cx_03_client_node::VERSION,
        addr = %service.config().http_addr(),
        "Client node is running. Press Ctrl+C to stop."
    );

    tokio::select! {
        result = service.start() => {
            result.context("client node stopped with an error")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Initiating graceful shutdown...");
        }
    }

    Ok(())
}
