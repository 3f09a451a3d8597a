//! Record types stored in the index
//!
//! Block and tx records use a fixed-width binary layout with little-endian
//! integers. The block hash is kept once per height in the block record so
//! the 32-byte hash is not repeated for every indexed transaction.
//!
//! The index tip is a small meta value and uses postcard.

use crate::error::IndexError;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Encoded length of a [`BlockRecord`].
pub const BLOCK_RECORD_LEN: usize = 36;

/// Encoded length of a [`TxRecord`].
pub const TX_RECORD_LEN: usize = 16;

/// Block record, one per height with at least one indexed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRecord {
    /// Hash of the block at this height
    pub block: B256,
    /// Block timestamp from the header (Unix epoch seconds)
    pub time: u32,
}

impl BlockRecord {
    /// Serialize as block hash (32 bytes) + time (4 bytes).
    pub fn encode(&self) -> [u8; BLOCK_RECORD_LEN] {
        let mut out = [0u8; BLOCK_RECORD_LEN];
        out[0..32].copy_from_slice(self.block.as_slice());
        out[32..36].copy_from_slice(&self.time.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() != BLOCK_RECORD_LEN {
            return Err(IndexError::MalformedRecord {
                kind: "block record",
                expected: BLOCK_RECORD_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            block: B256::from_slice(&bytes[0..32]),
            time: read_u32(&bytes[32..36]),
        })
    }
}

/// Tx record, one per indexed transaction.
///
/// Locates the transaction inside the stored block body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxRecord {
    /// Height of the containing block
    pub height: u32,
    /// Position of the transaction in the block's tx list
    pub index: u32,
    /// Byte offset of the transaction within the block body
    pub offset: u32,
    /// Serialized length of the transaction
    pub length: u32,
}

impl TxRecord {
    /// Serialize as height, index, offset, length (4 bytes each).
    pub fn encode(&self) -> [u8; TX_RECORD_LEN] {
        let mut out = [0u8; TX_RECORD_LEN];
        out[0..4].copy_from_slice(&self.height.to_le_bytes());
        out[4..8].copy_from_slice(&self.index.to_le_bytes());
        out[8..12].copy_from_slice(&self.offset.to_le_bytes());
        out[12..16].copy_from_slice(&self.length.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() != TX_RECORD_LEN {
            return Err(IndexError::MalformedRecord {
                kind: "tx record",
                expected: TX_RECORD_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            height: read_u32(&bytes[0..4]),
            index: read_u32(&bytes[4..8]),
            offset: read_u32(&bytes[8..12]),
            length: read_u32(&bytes[12..16]),
        })
    }
}

/// Last block applied to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTip {
    pub height: u32,
    pub hash: B256,
}

impl IndexTip {
    pub fn encode(&self) -> Result<Vec<u8>, IndexError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, IndexError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
