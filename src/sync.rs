//! Chain synchronization
//!
//! Polls a chain source, rewinds the index when the source's best chain no
//! longer contains the indexed tip, then connects new blocks in order.
//! Raw blocks are saved to the block store before they are indexed so
//! that queries and later disconnects can read them back.

use crate::blocks::BlockStore;
use crate::chain::{display_hash, Block, BlockMeta};
use crate::index::ChainListener;
use crate::records::IndexTip;
use alloy_primitives::B256;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source of best-chain blocks, usually a full node.
#[allow(async_fn_in_trait)]
pub trait ChainSource {
    /// Height of the best chain tip.
    async fn best_height(&self) -> Result<u32>;

    /// Hash of the best-chain block at `height`.
    async fn block_hash(&self, height: u32) -> Result<B256>;

    /// Serialized block for `hash`.
    async fn raw_block(&self, hash: B256) -> Result<Vec<u8>>;
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub connected: u32,
    pub disconnected: u32,
    pub tip: Option<IndexTip>,
}

/// Drives a [`ChainListener`] from a [`ChainSource`].
pub struct Synchronizer<C, L> {
    chain: C,
    listener: L,
    blocks: Arc<dyn BlockStore>,
    start_height: u32,
}

impl<C: ChainSource, L: ChainListener> Synchronizer<C, L> {
    /// Blocks below `start_height` are never connected.
    pub fn new(chain: C, listener: L, blocks: Arc<dyn BlockStore>, start_height: u32) -> Self {
        Self {
            chain,
            listener,
            blocks,
            start_height,
        }
    }

    /// Rewind stale blocks, then connect everything up to the source's tip.
    pub async fn sync_once(&self) -> Result<SyncReport> {
        let best = self
            .chain
            .best_height()
            .await
            .context("Failed to get best height")?;

        let mut report = SyncReport::default();

        while let Some(tip) = self.listener.tip().context("Failed to read index tip")? {
            if tip.height < self.start_height {
                break;
            }
            if tip.height <= best && self.chain.block_hash(tip.height).await? == tip.hash {
                break;
            }
            warn!(
                "Block {} at height {} left the best chain, rewinding",
                display_hash(&tip.hash),
                tip.height
            );
            self.disconnect(tip)?;
            report.disconnected += 1;
        }

        let (first, mut prev) = match self.listener.tip()? {
            Some(tip) if tip.height >= self.start_height => match tip.height.checked_add(1) {
                Some(next) => (next, Some(tip.hash)),
                None => return self.finish(report),
            },
            _ => (self.start_height, None),
        };

        for height in first..=best {
            let hash = self.chain.block_hash(height).await?;
            let raw = self
                .chain
                .raw_block(hash)
                .await
                .with_context(|| format!("Failed to fetch block {}", display_hash(&hash)))?;
            let block = Block::decode(&raw)
                .with_context(|| format!("Failed to decode block at height {}", height))?;
            if block.hash() != hash {
                anyhow::bail!(
                    "Block at height {} hashes to {}, expected {}",
                    height,
                    display_hash(&block.hash()),
                    display_hash(&hash)
                );
            }
            if let Some(prev_hash) = prev {
                if block.prev_block() != prev_hash {
                    // The source reorganized mid-pass; the next pass rewinds
                    warn!("Chain changed during sync at height {}, stopping pass", height);
                    break;
                }
            }

            self.blocks
                .put(hash, &raw)
                .context("Failed to store raw block")?;
            self.listener
                .on_connect(&BlockMeta { height, hash }, &block)
                .with_context(|| format!("Failed to index block at height {}", height))?;

            report.connected += 1;
            prev = Some(hash);
        }

        self.finish(report)
    }

    fn finish(&self, mut report: SyncReport) -> Result<SyncReport> {
        report.tip = self.listener.tip()?;
        Ok(report)
    }

    fn disconnect(&self, tip: IndexTip) -> Result<()> {
        let raw = self
            .blocks
            .get(tip.hash)?
            .with_context(|| format!("Block {} missing from block store", display_hash(&tip.hash)))?;
        let block = Block::decode(&raw).context("Failed to decode stored block")?;
        self.listener
            .on_disconnect(
                &BlockMeta {
                    height: tip.height,
                    hash: tip.hash,
                },
                &block,
            )
            .with_context(|| format!("Failed to unindex block at height {}", tip.height))?;
        Ok(())
    }

    /// Sync, sleep, repeat. Returns only on error.
    pub async fn run(&self, poll_interval: Duration) -> Result<()> {
        info!("Starting sync loop...");

        loop {
            let report = self.sync_once().await.context("Sync pass failed")?;
            let tip = report
                .tip
                .map(|tip| tip.height.to_string())
                .unwrap_or_else(|| "none".to_string());

            if report.connected > 0 || report.disconnected > 0 {
                info!(
                    "Sync pass: {} connected, {} disconnected, tip {}",
                    report.connected, report.disconnected, tip
                );
            } else {
                debug!("Up to date. Tip: {}", tip);
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}
