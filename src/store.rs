//! IndexStore trait and RocksDB implementation
//!
//! Holds the three record families plus the index tip in a single column
//! family. All mutations go through [`IndexBatch`] so that one block's
//! records are written or removed together.

use crate::error::IndexError;
use crate::keys::{
    decode_height_key, encode_block_key, encode_meta_key, encode_tx_key, height_key_max,
    height_key_min, META_TIP,
};
use crate::records::{BlockRecord, IndexTip, TxRecord};
use alloy_primitives::B256;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;

const INDEX_CF: &str = "index";

/// Lazy sequence of txids from a height range scan.
pub type TxidIter<'a> = Box<dyn Iterator<Item = Result<B256, IndexError>> + 'a>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Writes and deletes that commit as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexBatch {
    ops: Vec<BatchOp>,
}

impl IndexBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put(key, value.into()));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete(key));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Trait defining the storage interface of the index.
///
/// Missing keys come back as `None`; stored bytes that fail to decode are
/// reported as [`IndexError::MalformedRecord`].
pub trait IndexStore: Send + Sync {
    /// Apply every operation in the batch atomically.
    fn commit(&self, batch: IndexBatch) -> Result<(), IndexError>;

    /// Get the tx record for a txid.
    fn get_tx_record(&self, txid: B256) -> Result<Option<TxRecord>, IndexError>;

    /// Get the block record at a height.
    fn get_block_record(&self, height: u32) -> Result<Option<BlockRecord>, IndexError>;

    /// Read a tx record and the block record it references from one snapshot.
    fn get_tx_with_block(
        &self,
        txid: B256,
    ) -> Result<Option<(TxRecord, Option<BlockRecord>)>, IndexError>;

    /// Check whether a tx record exists.
    fn has_tx(&self, txid: B256) -> Result<bool, IndexError>;

    /// Iterate txids indexed at heights `start..=stop`, ordered by (height, txid).
    fn txids_in_range(&self, start: u32, stop: u32) -> Result<TxidIter<'_>, IndexError>;

    /// Get the last block applied to the index.
    fn get_tip(&self) -> Result<Option<IndexTip>, IndexError>;
}

/// RocksDB-backed implementation of IndexStore.
pub struct RocksIndexStore {
    db: DB,
}

impl RocksIndexStore {
    /// Open or create an index database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = vec![ColumnFamilyDescriptor::new(INDEX_CF, Options::default())];
        let db = DB::open_cf_descriptors(&opts, path, column_families)?;
        Ok(Self { db })
    }

    fn get_cf(&self) -> Result<&rocksdb::ColumnFamily, IndexError> {
        self.db
            .cf_handle(INDEX_CF)
            .ok_or(IndexError::MissingColumnFamily(INDEX_CF))
    }
}

impl IndexStore for RocksIndexStore {
    fn commit(&self, batch: IndexBatch) -> Result<(), IndexError> {
        if batch.is_empty() {
            return Ok(());
        }
        let cf = self.get_cf()?;
        let mut write = WriteBatch::default();
        for op in batch.ops {
            match op {
                BatchOp::Put(key, value) => write.put_cf(cf, key, value),
                BatchOp::Delete(key) => write.delete_cf(cf, key),
            }
        }
        self.db.write(write)?;
        Ok(())
    }

    fn get_tx_record(&self, txid: B256) -> Result<Option<TxRecord>, IndexError> {
        let cf = self.get_cf()?;
        match self.db.get_pinned_cf(cf, encode_tx_key(txid))? {
            Some(bytes) => Ok(Some(TxRecord::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_block_record(&self, height: u32) -> Result<Option<BlockRecord>, IndexError> {
        let cf = self.get_cf()?;
        match self.db.get_pinned_cf(cf, encode_block_key(height))? {
            Some(bytes) => Ok(Some(BlockRecord::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_tx_with_block(
        &self,
        txid: B256,
    ) -> Result<Option<(TxRecord, Option<BlockRecord>)>, IndexError> {
        let cf = self.get_cf()?;
        let snapshot = self.db.snapshot();

        let tx = match snapshot.get_cf(cf, encode_tx_key(txid))? {
            Some(bytes) => TxRecord::decode(&bytes)?,
            None => return Ok(None),
        };
        let block = match snapshot.get_cf(cf, encode_block_key(tx.height))? {
            Some(bytes) => Some(BlockRecord::decode(&bytes)?),
            None => None,
        };
        Ok(Some((tx, block)))
    }

    fn has_tx(&self, txid: B256) -> Result<bool, IndexError> {
        let cf = self.get_cf()?;
        Ok(self.db.get_pinned_cf(cf, encode_tx_key(txid))?.is_some())
    }

    fn txids_in_range(&self, start: u32, stop: u32) -> Result<TxidIter<'_>, IndexError> {
        if start > stop {
            return Ok(Box::new(std::iter::empty()));
        }
        let cf = self.get_cf()?;
        let lower = height_key_min(start);
        let upper = height_key_max(stop);

        // The iterator reads from an implicit snapshot taken at creation
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&lower, Direction::Forward));

        Ok(Box::new(iter.map_while(move |item| match item {
            Err(e) => Some(Err(IndexError::from(e))),
            Ok((key, _)) if key.as_ref() > upper.as_slice() => None,
            Ok((key, _)) => Some(decode_height_key(&key).map(|(_, txid)| txid)),
        })))
    }

    fn get_tip(&self) -> Result<Option<IndexTip>, IndexError> {
        let cf = self.get_cf()?;
        match self.db.get_pinned_cf(cf, encode_meta_key(META_TIP))? {
            Some(bytes) => Ok(Some(IndexTip::decode(&bytes)?)),
            None => Ok(None),
        }
    }
}
