//! OP_RETURN indexer daemon
//!
//! Follows a bitcoind node, indexes transactions carrying a sidetree
//! anchor, and serves them over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use opri::blocks::RocksBlockStore;
use opri::config::{IndexerArgs, IndexerConfig};
use opri::http;
use opri::index::OpReturnIndexer;
use opri::query::QueryService;
use opri::rpc::RpcClient;
use opri::store::RocksIndexStore;
use opri::sync::Synchronizer;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = IndexerConfig::from_args(IndexerArgs::parse())?;

    info!("Starting OP_RETURN indexer");
    info!("RPC URL: {}", config.rpc_url);
    info!("Index: {:?}", config.index_path);
    info!("Blocks: {:?}", config.blocks_path);
    info!("Start height: {}", config.start_height);

    let store = Arc::new(
        RocksIndexStore::open(&config.index_path)
            .with_context(|| format!("Failed to open index database at {:?}", config.index_path))?,
    );
    let blocks = Arc::new(
        RocksBlockStore::open(&config.blocks_path)
            .with_context(|| format!("Failed to open block store at {:?}", config.blocks_path))?,
    );

    let mut rpc = RpcClient::new(config.rpc_url.clone());
    if let Some((user, password)) = config.rpc_auth.clone() {
        rpc = rpc.with_auth(user, password);
    }

    let indexer = OpReturnIndexer::new(store.clone(), config.filter.clone());
    info!("Filter prefix: {}", hex::encode(indexer.filter().prefix()));
    let synchronizer = Synchronizer::new(rpc, indexer, blocks.clone(), config.start_height);

    // Serve queries while syncing
    let app = http::mount(&config.http_prefix, QueryService::new(store, blocks));
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    info!("HTTP API listening on {}{}", config.listen, config.http_prefix);
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Handle Ctrl+C gracefully
    tokio::select! {
        result = synchronizer.run(config.poll_interval) => {
            server.abort();
            result.context("Synchronizer error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            server.abort();
        }
    }

    info!("Indexer stopped");
    Ok(())
}
