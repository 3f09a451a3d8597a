//! Opri - Bitcoin OP_RETURN transaction indexer
//!
//! Indexes transactions whose outputs carry a fixed OP_RETURN prefix
//! (sidetree anchors by default) by transaction hash and by block height,
//! and answers lookups by reading the transaction bytes back from a
//! block store.

pub mod keys;
pub mod records;
pub mod error;
pub mod filter;
pub mod chain;
pub mod blocks;
pub mod store;
pub mod index;
pub mod query;
pub mod http;
pub mod cli;

// Daemon modules
pub mod config;
pub mod rpc;
pub mod sync;

#[cfg(test)]
mod testutil;

// Re-export the main types for convenience
pub use blocks::{BlockStore, BlockStoreError, RocksBlockStore};
pub use chain::{Block, BlockMeta, TxHashes};
pub use error::IndexError;
pub use filter::{Filter, SIDETREE_FILTER};
pub use index::{ChainListener, OpReturnIndexer};
pub use query::{IndexedLocation, QueryService, TxMeta};
pub use records::{BlockRecord, IndexTip, TxRecord};
pub use store::{IndexStore, RocksIndexStore};
