//! Read-only queries over the index
//!
//! A point lookup goes tx record -> block record -> block store bytes ->
//! decoded transaction. The first two steps are captured by
//! [`IndexedLocation`]; the byte read and decode happen in
//! [`QueryService::get_meta`].

use crate::blocks::BlockStore;
use crate::chain::{decode_tx, display_hash, TxHashes};
use crate::error::IndexError;
use crate::records::{BlockRecord, TxRecord};
use crate::store::{IndexStore, TxidIter};
use alloy_primitives::B256;
use bitcoin::consensus::encode;
use bitcoin::Transaction;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

/// Where an indexed transaction lives, as far as the index knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedLocation {
    /// No tx record for the hash.
    NotIndexed,
    /// A tx record exists but its height has no block record.
    MissingBlock { tx: TxRecord },
    /// Both records are present.
    Located { tx: TxRecord, block: BlockRecord },
}

/// A transaction with the block context it was indexed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMeta {
    pub tx: Transaction,
    pub height: u32,
    pub block: B256,
    pub time: u32,
    pub index: u32,
}

#[derive(Serialize)]
struct PrevoutJson {
    hash: String,
    index: u32,
}

#[derive(Serialize)]
struct InputJson {
    prevout: PrevoutJson,
    script: String,
    witness: Vec<String>,
    sequence: u32,
}

#[derive(Serialize)]
struct OutputJson {
    value: u64,
    script: String,
}

#[derive(Serialize)]
struct TxMetaJson {
    hash: String,
    witness_hash: String,
    height: u32,
    block: String,
    time: u32,
    index: u32,
    version: i32,
    locktime: u32,
    inputs: Vec<InputJson>,
    outputs: Vec<OutputJson>,
    hex: String,
}

impl Serialize for TxMeta {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let json = TxMetaJson {
            hash: display_hash(&self.tx.txid_hash()),
            witness_hash: display_hash(&self.tx.wtxid_hash()),
            height: self.height,
            block: display_hash(&self.block),
            time: self.time,
            index: self.index,
            version: self.tx.version.0,
            locktime: self.tx.lock_time.to_consensus_u32(),
            inputs: self
                .tx
                .input
                .iter()
                .map(|input| InputJson {
                    prevout: PrevoutJson {
                        hash: input.previous_output.txid.to_string(),
                        index: input.previous_output.vout,
                    },
                    script: hex::encode(input.script_sig.as_bytes()),
                    witness: input.witness.iter().map(hex::encode).collect(),
                    sequence: input.sequence.0,
                })
                .collect(),
            outputs: self
                .tx
                .output
                .iter()
                .map(|output| OutputJson {
                    value: output.value.to_sat(),
                    script: hex::encode(output.script_pubkey.as_bytes()),
                })
                .collect(),
            hex: encode::serialize_hex(&self.tx),
        };
        json.serialize(serializer)
    }
}

/// Point lookups and range scans over the index.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn IndexStore>,
    blocks: Arc<dyn BlockStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn IndexStore>, blocks: Arc<dyn BlockStore>) -> Self {
        Self { store, blocks }
    }

    /// Txids indexed at heights `start..=stop`, ordered by (height, txid).
    ///
    /// The order within a height is by hash, not by position in the block.
    /// `start > stop` yields nothing.
    pub fn get_range(&self, start: u32, stop: u32) -> Result<TxidIter<'_>, IndexError> {
        self.store.txids_in_range(start, stop)
    }

    /// Resolve both index records for a txid from one snapshot.
    pub fn locate(&self, txid: B256) -> Result<IndexedLocation, IndexError> {
        Ok(match self.store.get_tx_with_block(txid)? {
            None => IndexedLocation::NotIndexed,
            Some((tx, None)) => IndexedLocation::MissingBlock { tx },
            Some((tx, Some(block))) => IndexedLocation::Located { tx, block },
        })
    }

    /// Get a transaction with its block context.
    pub fn get_meta(&self, txid: B256) -> Result<Option<TxMeta>, IndexError> {
        let (record, block) = match self.locate(txid)? {
            IndexedLocation::NotIndexed => return Ok(None),
            IndexedLocation::MissingBlock { tx } => {
                warn!(
                    "Tx {} references height {} with no block record",
                    display_hash(&txid),
                    tx.height
                );
                return Ok(None);
            }
            IndexedLocation::Located { tx, block } => (tx, block),
        };

        let fault = |reason: String| {
            error!("Index integrity fault for tx {}: {}", display_hash(&txid), reason);
            IndexError::ConsistencyFault {
                txid: display_hash(&txid),
                reason,
            }
        };

        let data = self
            .blocks
            .read(block.block, record.offset, record.length)
            .map_err(|e| fault(e.to_string()))?;
        let tx = decode_tx(&data)
            .map_err(|e| fault(format!("stored bytes do not decode: {}", e)))?;
        if tx.txid_hash() != txid {
            return Err(fault(format!(
                "stored bytes decode to tx {}",
                display_hash(&tx.txid_hash())
            )));
        }

        Ok(Some(TxMeta {
            tx,
            height: record.height,
            block: block.block,
            time: block.time,
            index: record.index,
        }))
    }

    /// Get a transaction without its block context.
    pub fn get_tx(&self, txid: B256) -> Result<Option<Transaction>, IndexError> {
        Ok(self.get_meta(txid)?.map(|meta| meta.tx))
    }

    /// Check for a tx record. The block record is not consulted.
    pub fn has_tx(&self, txid: B256) -> Result<bool, IndexError> {
        self.store.has_tx(txid)
    }
}
