//! `digest-node`: digests exported blocks and serves the query API.

use anyhow::{Context, Result};
use digest_node::{DigestNode, NodeConfig};
use digest_telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env();
    init_tracing(&config.telemetry).context("Failed to initialize logging")?;

    info!("===========================================");
    info!("  Chain Digest Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!("Blocks Dir: {:?}", config.reader.blocks_dir);
    info!("Store: {:?} at {:?}", config.store.backend, config.store.path);
    info!("API: {}", config.api.addr());

    let node = DigestNode::new(config).context("Failed to create digest node")?;
    let watermark = node
        .start_digestion()
        .await
        .context("Failed to catch up on exported blocks")?;
    info!(watermark = ?watermark, "Digestion running");

    node.start_api();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    node.shutdown().await;
    Ok(())
}
