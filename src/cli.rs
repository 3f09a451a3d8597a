//! CLI implementation for oprictl
//!
//! Offline inspection of an index database and its block store.
//! All commands output pretty JSON.

use crate::blocks::RocksBlockStore;
use crate::chain::{display_hash, parse_display_hash};
use crate::query::{IndexedLocation, QueryService};
use crate::store::{IndexStore, RocksIndexStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// OP_RETURN index CLI tool
#[derive(Parser)]
#[command(name = "oprictl")]
#[command(about = "Inspect a sidetree OP_RETURN index")]
pub struct Cli {
    /// Path to the index RocksDB directory
    #[arg(short, long, default_value = "./opri_data/index")]
    db_path: PathBuf,

    /// Path to the block store RocksDB directory
    #[arg(short, long, default_value = "./opri_data/blocks")]
    blocks_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Show the last indexed block
    Tip,
    /// List indexed transaction hashes in a height range (inclusive)
    Range {
        /// First height
        start: u32,
        /// Last height
        stop: u32,
    },
    /// Check whether a transaction is indexed
    HasTx {
        /// Transaction hash (64 hex chars, display order)
        hash: String,
    },
    /// Show an indexed transaction with its block context
    GetTx {
        /// Transaction hash (64 hex chars, display order)
        hash: String,
    },
}

/// Evaluate one command against the index.
pub fn execute(command: &Commands, store: &dyn IndexStore, query: &QueryService) -> Result<Value> {
    let result = match command {
        Commands::Tip => match store.get_tip()? {
            Some(tip) => json!({
                "tip": {
                    "height": tip.height,
                    "hash": display_hash(&tip.hash),
                }
            }),
            None => json!({ "tip": null }),
        },
        Commands::Range { start, stop } => {
            let hashes = query
                .get_range(*start, *stop)?
                .map(|txid| txid.map(|txid| display_hash(&txid)))
                .collect::<Result<Vec<_>, _>>()?;
            json!({
                "start": start,
                "stop": stop,
                "count": hashes.len(),
                "txids": hashes,
            })
        }
        Commands::HasTx { hash } => {
            let txid = parse_display_hash(hash)
                .with_context(|| format!("Invalid transaction hash: {}", hash))?;
            let location = match query.locate(txid)? {
                IndexedLocation::NotIndexed => "not_indexed",
                IndexedLocation::MissingBlock { .. } => "missing_block",
                IndexedLocation::Located { .. } => "located",
            };
            json!({
                "hash": display_hash(&txid),
                "indexed": query.has_tx(txid)?,
                "location": location,
            })
        }
        Commands::GetTx { hash } => {
            let txid = parse_display_hash(hash)
                .with_context(|| format!("Invalid transaction hash: {}", hash))?;
            match query.get_meta(txid)? {
                Some(meta) => serde_json::to_value(&meta)?,
                None => json!({
                    "hash": display_hash(&txid),
                    "tx": null
                }),
            }
        }
    };
    Ok(result)
}

/// Run the CLI command and print JSON output.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = Arc::new(
        RocksIndexStore::open(&cli.db_path)
            .with_context(|| format!("Failed to open index database at {:?}", cli.db_path))?,
    );
    let blocks = Arc::new(
        RocksBlockStore::open(&cli.blocks_path)
            .with_context(|| format!("Failed to open block store at {:?}", cli.blocks_path))?,
    );
    let query = QueryService::new(store.clone(), blocks);

    let result = execute(&cli.command, store.as_ref(), &query)?;

    // Pretty print JSON
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
