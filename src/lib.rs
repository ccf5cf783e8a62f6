//! A canonical-chain index: durable storage of headers/bodies/receipts
//! behind a pluggable key-value backend, with fork tracking, reorg handling
//! and a synchronous observer feed layered on top.
//!
//! See [`engine::ChainEngine`] for the main entry point.

pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod observer;
pub mod primitives;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use engine::ChainEngine;
pub use error::{ChainError, ChainResult, StorageError};
pub use events::ChainEvent;
pub use observer::{ChainObserver, SubscriptionId};
pub use primitives::{
    Block, BlockBody, BlockHeader, BlockNumber, ChainHead, Difficulty, Hash, Transaction,
    TransactionLocation, TransactionReceipt,
};
pub use storage::{memory::MemoryBackend, rocks::RocksBackend, Database, DatabaseUpdater};
