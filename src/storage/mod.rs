//! Storage backend interface (C1): an opaque transactional KV store exposing
//! the key families of spec §3 through pure reads and a batch/commit/
//! rollback updater.
//!
//! This module only defines the contract. See [`memory`] for the in-memory
//! reference implementation used by tests, and [`rocks`] for the
//! `rocksdb`-backed production binding.

pub mod memory;
pub mod rocks;

use crate::error::StorageError;
use crate::primitives::{
    BlockBody, BlockHeader, BlockNumber, Difficulty, Hash, TransactionLocation, TransactionReceipt,
};
use std::collections::HashSet;

/// Read side of the storage contract. Implementations must give
/// read-your-own-writes behavior only *after* an updater's `commit`; reads
/// issued while an updater is open and uncommitted observe the state as of
/// the last commit (spec §4.1).
pub trait Database: Send + Sync {
    /// The atomic batch type returned by [`Database::updater`].
    type Updater<'a>: DatabaseUpdater
    where
        Self: 'a;

    /// Look up a header by hash, canonical or not.
    fn get_header(&self, hash: Hash) -> Result<Option<BlockHeader>, StorageError>;
    /// Look up a body by hash, canonical or not.
    fn get_body(&self, hash: Hash) -> Result<Option<BlockBody>, StorageError>;
    /// Look up a receipt bundle by hash, canonical or not.
    fn get_receipts(&self, hash: Hash) -> Result<Option<Vec<TransactionReceipt>>, StorageError>;
    /// Total difficulty of the block with this hash.
    fn get_td(&self, hash: Hash) -> Result<Option<Difficulty>, StorageError>;
    /// Canonical hash at a given height.
    fn get_hash(&self, number: BlockNumber) -> Result<Option<Hash>, StorageError>;
    /// Canonical location of a transaction.
    fn get_tx_location(&self, tx_hash: Hash) -> Result<Option<TransactionLocation>, StorageError>;
    /// Current canonical tip hash, if genesis has been installed.
    fn get_chain_head(&self) -> Result<Option<Hash>, StorageError>;
    /// Current set of tracked fork heads.
    fn get_fork_heads(&self) -> Result<HashSet<Hash>, StorageError>;

    /// Open a new atomic batch. Writes made through it are invisible to
    /// concurrent readers (and to the updater's own reads, there are none)
    /// until [`DatabaseUpdater::commit`] returns successfully.
    fn updater(&self) -> Result<Self::Updater<'_>, StorageError>;
}

/// Write side of the storage contract: an atomic, all-or-nothing batch.
///
/// An updater is owned by the stack frame that created it and is never
/// shared across threads or tasks (spec §5); it is consumed by either
/// [`DatabaseUpdater::commit`] or [`DatabaseUpdater::rollback`].
pub trait DatabaseUpdater: Sized {
    /// Write a header row.
    fn put_header(&mut self, hash: Hash, header: &BlockHeader) -> Result<(), StorageError>;
    /// Write a body row.
    fn put_body(&mut self, hash: Hash, body: &BlockBody) -> Result<(), StorageError>;
    /// Write a receipt-bundle row.
    fn put_receipts(
        &mut self,
        hash: Hash,
        receipts: &[TransactionReceipt],
    ) -> Result<(), StorageError>;
    /// Write a total-difficulty row.
    fn put_td(&mut self, hash: Hash, td: Difficulty) -> Result<(), StorageError>;
    /// Write a canonical number→hash row.
    fn put_hash(&mut self, number: BlockNumber, hash: Hash) -> Result<(), StorageError>;
    /// Remove a canonical number→hash row (it is no longer canonical).
    fn remove_hash(&mut self, number: BlockNumber) -> Result<(), StorageError>;
    /// Write a canonical transaction-location row.
    fn put_tx_location(
        &mut self,
        tx_hash: Hash,
        location: TransactionLocation,
    ) -> Result<(), StorageError>;
    /// Remove a transaction-location row (the transaction is no longer
    /// canonical).
    fn remove_tx_location(&mut self, tx_hash: Hash) -> Result<(), StorageError>;
    /// Rewrite the canonical tip pointer.
    fn set_chain_head(&mut self, hash: Hash) -> Result<(), StorageError>;
    /// Rewrite the fork-heads set.
    fn set_fork_heads(&mut self, heads: &HashSet<Hash>) -> Result<(), StorageError>;

    /// Apply every write in this batch atomically. Consumes the updater.
    fn commit(self) -> Result<(), StorageError>;
    /// Discard every write in this batch. Consumes the updater.
    fn rollback(self);
}
