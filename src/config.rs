//! Indexer daemon configuration
//!
//! Command-line arguments are parsed with clap and validated into an
//! [`IndexerConfig`] before any store is opened.

use crate::filter::Filter;
use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Bitcoin OP_RETURN indexer
#[derive(Parser, Debug, Clone)]
#[command(name = "opri-indexer")]
#[command(about = "Index sidetree OP_RETURN anchors from a bitcoind node and serve them over HTTP")]
pub struct IndexerArgs {
    /// bitcoind RPC endpoint URL
    #[arg(long, default_value = "http://127.0.0.1:8332")]
    pub rpc_url: String,

    /// RPC username (rpcuser)
    #[arg(long)]
    pub rpc_user: Option<String>,

    /// RPC password (rpcpassword)
    #[arg(long)]
    pub rpc_password: Option<String>,

    /// Directory holding the index and block databases
    #[arg(long, default_value = "./opri_data")]
    pub data_dir: PathBuf,

    /// HTTP listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: String,

    /// Path prefix for the HTTP API
    #[arg(long, default_value = "/opri")]
    pub http_prefix: String,

    /// First block height to index
    #[arg(long, default_value_t = 0)]
    pub start_height: u32,

    /// Seconds between sync passes
    #[arg(long, default_value_t = 10)]
    pub poll_secs: u64,
}

/// Validated daemon settings.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub rpc_url: String,
    pub rpc_auth: Option<(String, String)>,
    pub index_path: PathBuf,
    pub blocks_path: PathBuf,
    pub listen: SocketAddr,
    pub http_prefix: String,
    pub start_height: u32,
    pub poll_interval: Duration,
    pub filter: Filter,
}

impl IndexerConfig {
    pub fn from_args(args: IndexerArgs) -> Result<Self> {
        if !(args.rpc_url.starts_with("http://") || args.rpc_url.starts_with("https://")) {
            anyhow::bail!("RPC URL must start with http:// or https://, got '{}'", args.rpc_url);
        }

        let rpc_auth = match (args.rpc_user, args.rpc_password) {
            (Some(user), Some(password)) => Some((user, password)),
            (None, None) => None,
            _ => anyhow::bail!("--rpc-user and --rpc-password must be given together"),
        };

        let listen: SocketAddr = args
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", args.listen))?;

        let http_prefix = normalize_prefix(&args.http_prefix)?;

        if args.poll_secs == 0 {
            anyhow::bail!("--poll-secs must be at least 1");
        }

        Ok(Self {
            rpc_url: args.rpc_url,
            rpc_auth,
            index_path: args.data_dir.join("index"),
            blocks_path: args.data_dir.join("blocks"),
            listen,
            http_prefix,
            start_height: args.start_height,
            poll_interval: Duration::from_secs(args.poll_secs),
            filter: Filter::sidetree(),
        })
    }
}

/// `""` and `"/"` mean the root; anything else must start with `/`.
fn normalize_prefix(prefix: &str) -> Result<String> {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !trimmed.starts_with('/') {
        anyhow::bail!("HTTP prefix must start with '/', got '{}'", prefix);
    }
    if trimmed.contains(':') || trimmed.contains('*') {
        anyhow::bail!("HTTP prefix must not contain path parameters: {}", prefix);
    }
    Ok(trimmed.to_string())
}
