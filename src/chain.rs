//! Bitcoin block and transaction decoding
//!
//! Blocks and transactions are decoded with rust-bitcoin. Decoding a block
//! also records where each transaction sits inside the block body so the
//! index can point back into stored bytes.

use alloy_primitives::B256;
use bitcoin::consensus::encode::{self, VarInt};
use bitcoin::hashes::Hash;
use bitcoin::Transaction;
use thiserror::Error;

const HEADER_LEN: usize = 80;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("decoding failed: {0}")]
    Decode(#[from] encode::Error),

    #[error("block of {0} bytes cannot be addressed with 32-bit offsets")]
    BlockTooLarge(usize),

    #[error("transactions cover {covered} of {total} block bytes")]
    Leftover { covered: usize, total: usize },

    #[error("invalid hash: {0}")]
    InvalidHash(String),
}

/// Height and hash of a block on the best chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    pub height: u32,
    pub hash: B256,
}

/// Transaction hashes as stored in the index, in internal byte order.
pub trait TxHashes {
    /// Hash of the witness-stripped serialization.
    fn txid_hash(&self) -> B256;

    /// Hash of the full serialization.
    fn wtxid_hash(&self) -> B256;
}

impl TxHashes for Transaction {
    fn txid_hash(&self) -> B256 {
        B256::from(self.compute_txid().to_byte_array())
    }

    fn wtxid_hash(&self) -> B256 {
        B256::from(self.compute_wtxid().to_byte_array())
    }
}

/// Decode a transaction that must span all of `raw`.
pub fn decode_tx(raw: &[u8]) -> Result<Transaction, DecodeError> {
    Ok(encode::deserialize(raw)?)
}

/// A transaction and its position within the serialized block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTx {
    pub tx: Transaction,
    /// Position in the block's transaction list
    pub index: u32,
    /// Byte offset from the start of the block
    pub offset: u32,
    /// Serialized length in bytes
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: bitcoin::blockdata::block::Header,
    pub txs: Vec<BlockTx>,
    hash: B256,
}

impl Block {
    /// Decode a full serialized block.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        if u32::try_from(raw.len()).is_err() {
            return Err(DecodeError::BlockTooLarge(raw.len()));
        }

        let block: bitcoin::Block = encode::deserialize(raw)?;
        let hash = B256::from(block.block_hash().to_byte_array());

        // Consensus encoding is canonical, so re-encoded sizes match the input
        let mut offset = HEADER_LEN + VarInt(block.txdata.len() as u64).size();
        let mut txs = Vec::with_capacity(block.txdata.len());
        for (index, tx) in block.txdata.into_iter().enumerate() {
            let length = tx.total_size();
            // raw.len() fits in u32, so every position within it does too
            let to_u32 = |n: usize| u32::try_from(n).map_err(|_| DecodeError::BlockTooLarge(raw.len()));
            txs.push(BlockTx {
                index: to_u32(index)?,
                offset: to_u32(offset)?,
                length: to_u32(length)?,
                tx,
            });
            offset += length;
        }
        if offset != raw.len() {
            return Err(DecodeError::Leftover {
                covered: offset,
                total: raw.len(),
            });
        }

        Ok(Self {
            header: block.header,
            txs,
            hash,
        })
    }

    /// Double SHA-256 of the header.
    pub fn hash(&self) -> B256 {
        self.hash
    }

    pub fn prev_block(&self) -> B256 {
        B256::from(self.header.prev_blockhash.to_byte_array())
    }

    pub fn time(&self) -> u32 {
        self.header.time
    }
}

/// Format a hash in reversed byte order, as block explorers and bitcoind show it.
pub fn display_hash(hash: &B256) -> String {
    let mut bytes = hash.0;
    bytes.reverse();
    hex::encode(bytes)
}

/// Parse a reversed-order hex hash (64 hex chars, optional 0x prefix).
pub fn parse_display_hash(s: &str) -> Result<B256, DecodeError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != 64 {
        return Err(DecodeError::InvalidHash(format!(
            "expected 64 hex chars, got {}",
            s.len()
        )));
    }
    let mut bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHash(e.to_string()))?;
    bytes.reverse();
    Ok(B256::from_slice(&bytes))
}
