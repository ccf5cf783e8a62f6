//! Domain types shared by the storage backend and the chain engine (C2).
//!
//! Everything here is immutable once written to the backing store; codecs
//! for these types are treated as an implementation detail of each
//! [`crate::storage::Database`] impl, not part of this module's contract.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Block height.
pub type BlockNumber = u64;

/// 32-byte identifier of a block or transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The all-zero hash, used as the parent of nothing in particular.
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// Hash arbitrary encoded bytes with Keccak-256, standing in for the
    /// real block/transaction codec (RLP or similar), which is out of
    /// scope for this crate (spec §1).
    pub fn digest(bytes: &[u8]) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(bytes);
        let out = hasher.finalize();
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&out);
        Hash(buf)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 256-bit unsigned quantity used both for a single block's proof-of-work
/// difficulty and for the cumulative total difficulty rooted at genesis.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Difficulty(pub U256);

impl Difficulty {
    /// Zero difficulty.
    pub const ZERO: Difficulty = Difficulty(U256::zero());

    /// Build from a plain `u64`, the common case in tests and small chains.
    pub fn from_u64(value: u64) -> Difficulty {
        Difficulty(U256::from(value))
    }

    /// Saturating addition; total difficulty must never wrap (spec §9).
    pub fn saturating_add(self, other: Difficulty) -> Difficulty {
        Difficulty(self.0.saturating_add(other.0))
    }
}

impl fmt::Debug for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque transaction. Signature/content validation happened upstream;
/// the index only needs a stable hash to key it by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque encoded transaction payload.
    pub payload: Vec<u8>,
}

impl Transaction {
    /// Content hash of this transaction.
    pub fn hash(&self) -> Hash {
        Hash::digest(&self.payload)
    }
}

/// Opaque payload stored alongside a block, one per transaction in its body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Opaque encoded receipt payload.
    pub payload: Vec<u8>,
}

/// Where a transaction lives on the canonical chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLocation {
    /// Hash of the block containing the transaction.
    pub block_hash: Hash,
    /// Index of the transaction within the block body.
    pub index: u32,
}

/// Ordered transactions plus ancillary data (e.g. uncles/ommers), opaque to
/// this core beyond needing to iterate the transaction list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    /// Transactions included in the block, in canonical order.
    pub transactions: Vec<Transaction>,
    /// Ancillary data (uncles/ommers, ...), not interpreted by this crate.
    pub ommers: Vec<Hash>,
}

/// Block header. `hash()` is derived purely from its fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Height; genesis has `number == 0`.
    pub number: BlockNumber,
    /// Hash of the parent header. Ignored (must be [`Hash::ZERO`]) for
    /// genesis.
    pub parent_hash: Hash,
    /// This block's own proof-of-work difficulty (not cumulative).
    pub difficulty: Difficulty,
    /// Construction-time timestamp, opaque to the engine.
    pub timestamp: u64,
    /// Opaque extra data, opaque to the engine.
    pub extra: Vec<u8>,
}

impl BlockHeader {
    /// Content hash of this header.
    pub fn hash(&self) -> Hash {
        // `unwrap` is safe: bincode only fails on writer errors, and we
        // write into an in-memory Vec.
        let encoded = bincode::serialize(self).expect("header encoding is infallible");
        Hash::digest(&encoded)
    }
}

/// A full block: header plus body. Already validated by an external
/// collaborator (spec §1) by the time it reaches this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block's header.
    pub header: BlockHeader,
    /// The block's body.
    pub body: BlockBody,
}

impl Block {
    /// Content hash of the block (delegates to its header).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Height of this block.
    pub fn number(&self) -> BlockNumber {
        self.header.number
    }

    /// Hash of this block's parent.
    pub fn parent_hash(&self) -> Hash {
        self.header.parent_hash
    }

    /// This block's own difficulty.
    pub fn difficulty(&self) -> Difficulty {
        self.header.difficulty
    }
}

/// Current canonical tip: hash plus its total difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    /// Hash of the canonical tip.
    pub hash: Hash,
    /// Total difficulty of the canonical tip.
    pub total_difficulty: Difficulty,
}
