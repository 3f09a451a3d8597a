//! JSON-RPC client for bitcoind
//!
//! Provides the few calls the synchronizer needs: best height, block hash
//! by height, and raw block bytes by hash.

use crate::chain::{display_hash, parse_display_hash};
use crate::sync::ChainSource;
use alloy_primitives::B256;
use anyhow::{Context, Result};
use serde_json::{json, Value};

/// JSON-RPC client for a bitcoind node.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    auth: Option<(String, String)>,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            auth: None,
        }
    }

    /// Use HTTP basic auth (rpcuser / rpcpassword).
    pub fn with_auth(mut self, user: String, password: String) -> Self {
        self.auth = Some((user, password));
        self
    }

    /// Make a JSON-RPC call.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "1.0",
            "id": "opri",
            "method": method,
            "params": params
        });

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some((user, password)) = &self.auth {
            builder = builder.basic_auth(user, Some(password));
        }

        // bitcoind answers RPC errors with a non-2xx status and a JSON body
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send RPC request '{}'", method))?;

        let json: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse RPC response for '{}'", method))?;

        extract_result(json)
    }

    /// Height of the node's best chain.
    pub async fn get_block_count(&self) -> Result<u32> {
        let result = self.call("getblockcount", json!([])).await?;
        let count = result
            .as_u64()
            .context("Block count response is not an integer")?;
        u32::try_from(count).context("Block count does not fit in u32")
    }

    /// Hash of the best-chain block at `height`.
    pub async fn get_block_hash(&self, height: u32) -> Result<B256> {
        let result = self.call("getblockhash", json!([height])).await?;
        let hash_str = result
            .as_str()
            .context("Block hash response is not a string")?;
        parse_display_hash(hash_str)
            .with_context(|| format!("Invalid block hash for height {}: {}", height, hash_str))
    }

    /// Serialized block bytes (`getblock <hash> 0`).
    pub async fn get_raw_block(&self, hash: B256) -> Result<Vec<u8>> {
        let result = self.call("getblock", json!([display_hash(&hash), 0])).await?;
        let block_hex = result
            .as_str()
            .context("Raw block response is not a string")?;
        hex::decode(block_hex).context("Failed to decode raw block hex")
    }
}

impl ChainSource for RpcClient {
    async fn best_height(&self) -> Result<u32> {
        self.get_block_count().await
    }

    async fn block_hash(&self, height: u32) -> Result<B256> {
        self.get_block_hash(height).await
    }

    async fn raw_block(&self, hash: B256) -> Result<Vec<u8>> {
        self.get_raw_block(hash).await
    }
}

/// Pull `result` out of a JSON-RPC response, failing on a non-null `error`.
fn extract_result(mut json: Value) -> Result<Value> {
    match json.get("error") {
        Some(error) if !error.is_null() => anyhow::bail!("RPC error: {}", error),
        _ => {}
    }
    match json.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => anyhow::bail!("RPC response missing 'result' field"),
    }
}
