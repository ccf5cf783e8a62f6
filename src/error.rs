//! Error taxonomy for the chain index.

use crate::primitives::Hash;

/// Errors surfaced by [`crate::engine::ChainEngine`].
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// `receipts.len() != block.body.transactions.len()`.
    #[error("expected {expected} receipts, got {got}")]
    ArgumentError {
        /// Number of transactions in the block body.
        expected: usize,
        /// Number of receipts supplied alongside the block.
        got: usize,
    },

    /// `append` was given a block whose parent header is not known.
    #[error("block {block} has unknown parent {parent}")]
    DisconnectedBlock {
        /// Hash of the block that could not be connected.
        block: Hash,
        /// Hash of the missing parent.
        parent: Hash,
    },

    /// The genesis block supplied at construction disagrees with the one
    /// already recorded in the backing store, or is malformed.
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    /// An expected row was missing mid-operation. The batch has already
    /// been rolled back by the time this is returned.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The storage backend itself failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors returned directly by a [`crate::storage::Database`] /
/// [`crate::storage::DatabaseUpdater`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The `rocksdb`-backed implementation failed.
    #[error(transparent)]
    Rocks(#[from] rocksdb::Error),

    /// Encoding or decoding a stored value failed.
    #[error(transparent)]
    Codec(#[from] Box<bincode::ErrorKind>),

    /// A named column family was not present on the opened database.
    #[error("column family not found: {0}")]
    MissingColumnFamily(&'static str),
}

/// Convenience alias used throughout the crate.
pub type ChainResult<T> = Result<T, ChainError>;
