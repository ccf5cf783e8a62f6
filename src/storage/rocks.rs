//! `rocksdb`-backed [`Database`] implementation: one column family per key
//! family of spec §3, one `rocksdb::WriteBatch` per updater, one
//! `DB::write` per commit.
//!
//! Grounded on rusty-blox's `AtomicBatchWriter`
//! (`examples/Liquid369-rusty-blox/src/atomic_writer.rs`): accumulate typed
//! operations, then flush every column family's share of them through a
//! single `WriteBatch` so the backend either applies the whole batch or
//! none of it.

use super::{Database, DatabaseUpdater};
use crate::error::StorageError;
use crate::primitives::{
    BlockBody, BlockHeader, BlockNumber, Difficulty, Hash, TransactionLocation, TransactionReceipt,
};
use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CF_HEADERS: &str = "headers";
const CF_BODIES: &str = "bodies";
const CF_RECEIPTS: &str = "receipts";
const CF_TD: &str = "total_difficulty";
const CF_NUM_TO_HASH: &str = "num_to_hash";
const CF_TX_LOCATIONS: &str = "tx_locations";
const CF_META: &str = "chain_meta";

const ALL_COLUMN_FAMILIES: &[&str] =
    &[CF_HEADERS, CF_BODIES, CF_RECEIPTS, CF_TD, CF_NUM_TO_HASH, CF_TX_LOCATIONS, CF_META];

const META_KEY_CHAIN_HEAD: &[u8] = b"chain_head";
const META_KEY_FORK_HEADS: &[u8] = b"fork_heads";
/// Backend-internal convenience marker; never read by the engine (spec §6).
const META_KEY_SCHEMA_VERSION: &[u8] = b"schema_version";
const SCHEMA_VERSION: u32 = 1;

/// Configuration for the `rocksdb` binding, following the config-struct
/// idiom of the teacher's CLI-arg modules so it can be embedded in a host
/// application's own config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// On-disk path for the database directory.
    pub path: PathBuf,
    /// `rocksdb` block cache size, in bytes. `0` disables the override and
    /// uses the library default.
    pub block_cache_bytes: usize,
}

impl StorageConfig {
    /// Configuration pointing at `path` with default tuning.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), block_cache_bytes: 0 }
    }
}

/// A `Database` backed by a `rocksdb` instance with one column family per
/// key family.
#[derive(Clone)]
pub struct RocksBackend {
    db: Arc<DB>,
}

impl RocksBackend {
    /// Open (creating if absent) a database at `config.path`.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        if config.block_cache_bytes > 0 {
            let cache = rocksdb::Cache::new_lru_cache(config.block_cache_bytes);
            let mut block_opts = rocksdb::BlockBasedOptions::default();
            block_opts.set_block_cache(&cache);
            opts.set_block_based_table_factory(&block_opts);
        }

        let cf_descriptors = ALL_COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)?;
        let db = Arc::new(db);

        let meta = cf_handle(&db, CF_META)?;
        if db.get_cf(meta, META_KEY_SCHEMA_VERSION)?.is_none() {
            db.put_cf(meta, META_KEY_SCHEMA_VERSION, SCHEMA_VERSION.to_be_bytes())?;
        }

        Ok(Self { db })
    }

    /// Open a database directly at `path` with default tuning.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open(&StorageConfig::new(path.as_ref().to_path_buf()))
    }
}

fn cf_handle<'a>(db: &'a DB, name: &'static str) -> Result<&'a rocksdb::ColumnFamily, StorageError> {
    db.cf_handle(name).ok_or(StorageError::MissingColumnFamily(name))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Atomic batch over a [`RocksBackend`], backed by a single
/// `rocksdb::WriteBatch`.
pub struct RocksUpdater<'a> {
    backend: &'a RocksBackend,
    batch: WriteBatch,
}

impl Database for RocksBackend {
    type Updater<'a> = RocksUpdater<'a>;

    fn get_header(&self, hash: Hash) -> Result<Option<BlockHeader>, StorageError> {
        let cf = cf_handle(&self.db, CF_HEADERS)?;
        self.db.get_cf(cf, hash.0)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn get_body(&self, hash: Hash) -> Result<Option<BlockBody>, StorageError> {
        let cf = cf_handle(&self.db, CF_BODIES)?;
        self.db.get_cf(cf, hash.0)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn get_receipts(&self, hash: Hash) -> Result<Option<Vec<TransactionReceipt>>, StorageError> {
        let cf = cf_handle(&self.db, CF_RECEIPTS)?;
        self.db.get_cf(cf, hash.0)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn get_td(&self, hash: Hash) -> Result<Option<Difficulty>, StorageError> {
        let cf = cf_handle(&self.db, CF_TD)?;
        self.db.get_cf(cf, hash.0)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn get_hash(&self, number: BlockNumber) -> Result<Option<Hash>, StorageError> {
        let cf = cf_handle(&self.db, CF_NUM_TO_HASH)?;
        self.db.get_cf(cf, number.to_be_bytes())?.map(|bytes| decode(&bytes)).transpose()
    }

    fn get_tx_location(&self, tx_hash: Hash) -> Result<Option<TransactionLocation>, StorageError> {
        let cf = cf_handle(&self.db, CF_TX_LOCATIONS)?;
        self.db.get_cf(cf, tx_hash.0)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn get_chain_head(&self) -> Result<Option<Hash>, StorageError> {
        let cf = cf_handle(&self.db, CF_META)?;
        self.db.get_cf(cf, META_KEY_CHAIN_HEAD)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn get_fork_heads(&self) -> Result<HashSet<Hash>, StorageError> {
        let cf = cf_handle(&self.db, CF_META)?;
        match self.db.get_cf(cf, META_KEY_FORK_HEADS)? {
            Some(bytes) => decode(&bytes),
            None => Ok(HashSet::new()),
        }
    }

    fn updater(&self) -> Result<Self::Updater<'_>, StorageError> {
        Ok(RocksUpdater { backend: self, batch: WriteBatch::default() })
    }
}

impl<'a> DatabaseUpdater for RocksUpdater<'a> {
    fn put_header(&mut self, hash: Hash, header: &BlockHeader) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_HEADERS)?;
        self.batch.put_cf(cf, hash.0, encode(header)?);
        Ok(())
    }

    fn put_body(&mut self, hash: Hash, body: &BlockBody) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_BODIES)?;
        self.batch.put_cf(cf, hash.0, encode(body)?);
        Ok(())
    }

    fn put_receipts(
        &mut self,
        hash: Hash,
        receipts: &[TransactionReceipt],
    ) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_RECEIPTS)?;
        self.batch.put_cf(cf, hash.0, encode(&receipts.to_vec())?);
        Ok(())
    }

    fn put_td(&mut self, hash: Hash, td: Difficulty) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_TD)?;
        self.batch.put_cf(cf, hash.0, encode(&td)?);
        Ok(())
    }

    fn put_hash(&mut self, number: BlockNumber, hash: Hash) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_NUM_TO_HASH)?;
        self.batch.put_cf(cf, number.to_be_bytes(), encode(&hash)?);
        Ok(())
    }

    fn remove_hash(&mut self, number: BlockNumber) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_NUM_TO_HASH)?;
        self.batch.delete_cf(cf, number.to_be_bytes());
        Ok(())
    }

    fn put_tx_location(
        &mut self,
        tx_hash: Hash,
        location: TransactionLocation,
    ) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_TX_LOCATIONS)?;
        self.batch.put_cf(cf, tx_hash.0, encode(&location)?);
        Ok(())
    }

    fn remove_tx_location(&mut self, tx_hash: Hash) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_TX_LOCATIONS)?;
        self.batch.delete_cf(cf, tx_hash.0);
        Ok(())
    }

    fn set_chain_head(&mut self, hash: Hash) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_META)?;
        self.batch.put_cf(cf, META_KEY_CHAIN_HEAD, encode(&hash)?);
        Ok(())
    }

    fn set_fork_heads(&mut self, heads: &HashSet<Hash>) -> Result<(), StorageError> {
        let cf = cf_handle(&self.backend.db, CF_META)?;
        self.batch.put_cf(cf, META_KEY_FORK_HEADS, encode(heads)?);
        Ok(())
    }

    fn commit(self) -> Result<(), StorageError> {
        self.backend.db.write(self.batch)?;
        Ok(())
    }

    fn rollback(self) {
        // Dropping `self.batch` without calling `DB::write` discards every
        // buffered operation; nothing was ever visible to readers.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{BlockHeader, Difficulty};

    fn header(number: BlockNumber, parent: Hash, difficulty: u64) -> BlockHeader {
        BlockHeader {
            number,
            parent_hash: parent,
            difficulty: Difficulty::from_u64(difficulty),
            timestamp: 0,
            extra: Vec::new(),
        }
    }

    #[test]
    fn uncommitted_updater_is_invisible() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RocksBackend::open_path(dir.path()).unwrap();
        let h = header(1, Hash::ZERO, 5);
        let hash = h.hash();

        let mut updater = backend.updater().unwrap();
        updater.put_header(hash, &h).unwrap();
        assert!(backend.get_header(hash).unwrap().is_none());

        updater.rollback();
        assert!(backend.get_header(hash).unwrap().is_none());
    }

    #[test]
    fn committed_updater_is_visible_and_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RocksBackend::open_path(dir.path()).unwrap();
        let h = header(1, Hash::ZERO, 5);
        let hash = h.hash();

        let mut updater = backend.updater().unwrap();
        updater.put_header(hash, &h).unwrap();
        updater.put_hash(1, hash).unwrap();
        updater.commit().unwrap();

        assert_eq!(backend.get_header(hash).unwrap().unwrap().number, 1);
        assert_eq!(backend.get_hash(1).unwrap(), Some(hash));
    }
}
