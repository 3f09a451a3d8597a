//! Block body storage
//!
//! Full serialized blocks keyed by block hash. The index only stores
//! offsets into these bodies and reads transactions back with
//! [`BlockStore::read`].

use crate::chain::display_hash;
use alloy_primitives::B256;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::Path;
use thiserror::Error;

const BLOCKS_CF: &str = "blocks";

#[derive(Debug, Error)]
pub enum BlockStoreError {
    #[error("block {0} not found")]
    NotFound(String),

    #[error("range {offset}+{length} out of bounds for block {block} of {size} bytes")]
    OutOfBounds {
        block: String,
        offset: u32,
        length: u32,
        size: usize,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    #[error("column family '{0}' not found")]
    MissingColumnFamily(&'static str),
}

/// Random-access storage of raw block bodies.
pub trait BlockStore: Send + Sync {
    /// Read `length` bytes at `offset` from the body of `block`.
    ///
    /// Fails if the block is absent or the range is out of bounds.
    fn read(&self, block: B256, offset: u32, length: u32) -> Result<Vec<u8>, BlockStoreError>;

    /// Get a full block body.
    fn get(&self, block: B256) -> Result<Option<Vec<u8>>, BlockStoreError>;

    /// Store a full block body.
    fn put(&self, block: B256, raw: &[u8]) -> Result<(), BlockStoreError>;
}

/// RocksDB-backed block store.
pub struct RocksBlockStore {
    db: DB,
}

impl RocksBlockStore {
    /// Open or create a block store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BlockStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = vec![ColumnFamilyDescriptor::new(BLOCKS_CF, Options::default())];
        let db = DB::open_cf_descriptors(&opts, path, column_families)?;
        Ok(Self { db })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily, BlockStoreError> {
        self.db
            .cf_handle(BLOCKS_CF)
            .ok_or(BlockStoreError::MissingColumnFamily(BLOCKS_CF))
    }
}

impl BlockStore for RocksBlockStore {
    fn read(&self, block: B256, offset: u32, length: u32) -> Result<Vec<u8>, BlockStoreError> {
        let body = self
            .db
            .get_pinned_cf(self.cf()?, block.as_slice())?
            .ok_or_else(|| BlockStoreError::NotFound(display_hash(&block)))?;

        let start = offset as usize;
        let end = start + length as usize;
        body.get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| BlockStoreError::OutOfBounds {
                block: display_hash(&block),
                offset,
                length,
                size: body.len(),
            })
    }

    fn get(&self, block: B256) -> Result<Option<Vec<u8>>, BlockStoreError> {
        Ok(self.db.get_cf(self.cf()?, block.as_slice())?)
    }

    fn put(&self, block: B256, raw: &[u8]) -> Result<(), BlockStoreError> {
        self.db.put_cf(self.cf()?, block.as_slice(), raw)?;
        Ok(())
    }
}
