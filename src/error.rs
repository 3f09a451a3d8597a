//! Error types for the index core
//!
//! Lookups that find nothing are not errors: they come back as `None`,
//! `false`, or an empty iterator. Everything here is a fault that stops
//! the operation.

use thiserror::Error;

/// Faults raised by the index store, the indexer, and the query service.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Stored bytes do not match the fixed-width layout.
    #[error("malformed {kind}: expected {expected} bytes, got {actual}")]
    MalformedRecord {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A tx record points at data that does not decode to the indexed transaction.
    #[error("consistency fault for tx {txid}: {reason}")]
    ConsistencyFault { txid: String, reason: String },

    /// Meta value could not be encoded or decoded.
    #[error("meta value encoding failed: {0}")]
    Encoding(#[from] postcard::Error),

    /// Underlying RocksDB failure.
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    #[error("column family '{0}' not found")]
    MissingColumnFamily(&'static str),
}

impl IndexError {
    /// True for faults that indicate corrupted or inconsistent index data.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            IndexError::MalformedRecord { .. }
                | IndexError::ConsistencyFault { .. }
                | IndexError::Encoding(_)
        )
    }
}
