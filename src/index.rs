//! Block indexing
//!
//! Applies connect and disconnect events from the chain to the index.
//! Each event becomes exactly one [`IndexBatch`], so a block is either
//! fully indexed or not indexed at all.

use crate::chain::{display_hash, Block, BlockMeta, TxHashes};
use crate::error::IndexError;
use crate::filter::Filter;
use crate::keys::{encode_block_key, encode_height_key, encode_meta_key, encode_tx_key, META_TIP};
use crate::records::{BlockRecord, IndexTip, TxRecord};
use crate::store::{IndexBatch, IndexStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Receives best-chain updates from a synchronizer.
///
/// Calls arrive one at a time and in chain order: every disconnect
/// reverses the most recent connect that has not been reversed yet.
pub trait ChainListener {
    /// A block was attached to the tip of the best chain.
    fn on_connect(&self, meta: &BlockMeta, block: &Block) -> Result<(), IndexError>;

    /// The block at the tip was detached from the best chain.
    fn on_disconnect(&self, meta: &BlockMeta, block: &Block) -> Result<(), IndexError>;

    /// Last block applied, if any.
    fn tip(&self) -> Result<Option<IndexTip>, IndexError>;
}

/// Indexes transactions with an output matching the filter.
pub struct OpReturnIndexer {
    store: Arc<dyn IndexStore>,
    filter: Filter,
}

impl OpReturnIndexer {
    pub fn new(store: Arc<dyn IndexStore>, filter: Filter) -> Self {
        Self { store, filter }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Build the writes for a connected block. Returns the batch and the match count.
    fn connect_batch(&self, meta: &BlockMeta, block: &Block) -> Result<(IndexBatch, usize), IndexError> {
        let mut batch = IndexBatch::new();
        let mut matched = 0;

        for entry in &block.txs {
            // One record per transaction, however many outputs match
            if !self.filter.matches_tx(&entry.tx) {
                continue;
            }

            let txid = entry.tx.txid_hash();
            let record = TxRecord {
                height: meta.height,
                index: entry.index,
                offset: entry.offset,
                length: entry.length,
            };
            batch.put(encode_tx_key(txid), record.encode());
            batch.put(encode_height_key(meta.height, txid), Vec::new());
            matched += 1;

            debug!(
                "Matched tx {} at height {} (index={}, offset={}, length={})",
                display_hash(&txid),
                meta.height,
                entry.index,
                entry.offset,
                entry.length
            );
        }

        if matched > 0 {
            let record = BlockRecord {
                block: meta.hash,
                time: block.time(),
            };
            batch.put(encode_block_key(meta.height), record.encode());
        }

        let tip = IndexTip {
            height: meta.height,
            hash: meta.hash,
        };
        batch.put(encode_meta_key(META_TIP), tip.encode()?);

        Ok((batch, matched))
    }

    /// Build the deletes for a disconnected block.
    fn disconnect_batch(&self, meta: &BlockMeta, block: &Block) -> Result<IndexBatch, IndexError> {
        let mut batch = IndexBatch::new();
        batch.delete(encode_block_key(meta.height));

        // Every tx is removed, matched or not; deleting absent keys is a no-op
        for entry in &block.txs {
            let txid = entry.tx.txid_hash();
            batch.delete(encode_tx_key(txid));
            batch.delete(encode_height_key(meta.height, txid));
        }

        match meta.height.checked_sub(1) {
            Some(height) => {
                let tip = IndexTip {
                    height,
                    hash: block.prev_block(),
                };
                batch.put(encode_meta_key(META_TIP), tip.encode()?);
            }
            None => batch.delete(encode_meta_key(META_TIP)),
        }

        Ok(batch)
    }
}

impl ChainListener for OpReturnIndexer {
    fn on_connect(&self, meta: &BlockMeta, block: &Block) -> Result<(), IndexError> {
        let (batch, matched) = self.connect_batch(meta, block)?;
        self.store.commit(batch)?;

        info!(
            "Connected block {} at height {} ({} txs, {} indexed)",
            display_hash(&meta.hash),
            meta.height,
            block.txs.len(),
            matched
        );
        Ok(())
    }

    fn on_disconnect(&self, meta: &BlockMeta, block: &Block) -> Result<(), IndexError> {
        let batch = self.disconnect_batch(meta, block)?;
        self.store.commit(batch)?;

        info!(
            "Disconnected block {} at height {} ({} txs)",
            display_hash(&meta.hash),
            meta.height,
            block.txs.len()
        );
        Ok(())
    }

    fn tip(&self) -> Result<Option<IndexTip>, IndexError> {
        self.store.get_tip()
    }
}
