//! In-memory reference [`Database`] implementation, used by the test
//! harness (C9) and suitable for embedding an index without persistence.
//!
//! Grounded on the teacher's `reth_db::mdbx::test_utils::create_test_rw_db`
//! pattern: a throwaway backing store wired through exactly the same trait
//! the production binding ([`super::rocks`]) implements, so engine tests
//! exercise real trait dispatch rather than a special-cased mock.

use super::{Database, DatabaseUpdater};
use crate::error::StorageError;
use crate::primitives::{
    BlockBody, BlockHeader, BlockNumber, Difficulty, Hash, TransactionLocation, TransactionReceipt,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct State {
    headers: HashMap<Hash, BlockHeader>,
    bodies: HashMap<Hash, BlockBody>,
    receipts: HashMap<Hash, Vec<TransactionReceipt>>,
    tds: HashMap<Hash, Difficulty>,
    num_to_hash: HashMap<BlockNumber, Hash>,
    tx_locations: HashMap<Hash, TransactionLocation>,
    chain_head: Option<Hash>,
    fork_heads: HashSet<Hash>,
}

/// A `Database` backed by plain in-process maps behind one `RwLock`.
///
/// Cheap to clone: every clone shares the same underlying state, which is
/// convenient for tests that need a handle independent of the
/// [`crate::engine::ChainEngine`] under test.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<State>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

enum Op {
    PutHeader(Hash, BlockHeader),
    PutBody(Hash, BlockBody),
    PutReceipts(Hash, Vec<TransactionReceipt>),
    PutTd(Hash, Difficulty),
    PutHash(BlockNumber, Hash),
    RemoveHash(BlockNumber),
    PutTxLocation(Hash, TransactionLocation),
    RemoveTxLocation(Hash),
    SetChainHead(Hash),
    SetForkHeads(HashSet<Hash>),
}

/// Atomic batch over a [`MemoryBackend`]; operations are buffered and only
/// applied to the shared state on [`DatabaseUpdater::commit`].
pub struct MemoryUpdater<'a> {
    backend: &'a MemoryBackend,
    ops: Vec<Op>,
}

impl Database for MemoryBackend {
    type Updater<'a> = MemoryUpdater<'a>;

    fn get_header(&self, hash: Hash) -> Result<Option<BlockHeader>, StorageError> {
        Ok(self.state.read().headers.get(&hash).cloned())
    }

    fn get_body(&self, hash: Hash) -> Result<Option<BlockBody>, StorageError> {
        Ok(self.state.read().bodies.get(&hash).cloned())
    }

    fn get_receipts(&self, hash: Hash) -> Result<Option<Vec<TransactionReceipt>>, StorageError> {
        Ok(self.state.read().receipts.get(&hash).cloned())
    }

    fn get_td(&self, hash: Hash) -> Result<Option<Difficulty>, StorageError> {
        Ok(self.state.read().tds.get(&hash).copied())
    }

    fn get_hash(&self, number: BlockNumber) -> Result<Option<Hash>, StorageError> {
        Ok(self.state.read().num_to_hash.get(&number).copied())
    }

    fn get_tx_location(&self, tx_hash: Hash) -> Result<Option<TransactionLocation>, StorageError> {
        Ok(self.state.read().tx_locations.get(&tx_hash).copied())
    }

    fn get_chain_head(&self) -> Result<Option<Hash>, StorageError> {
        Ok(self.state.read().chain_head)
    }

    fn get_fork_heads(&self) -> Result<HashSet<Hash>, StorageError> {
        Ok(self.state.read().fork_heads.clone())
    }

    fn updater(&self) -> Result<Self::Updater<'_>, StorageError> {
        Ok(MemoryUpdater { backend: self, ops: Vec::new() })
    }
}

impl<'a> DatabaseUpdater for MemoryUpdater<'a> {
    fn put_header(&mut self, hash: Hash, header: &BlockHeader) -> Result<(), StorageError> {
        self.ops.push(Op::PutHeader(hash, header.clone()));
        Ok(())
    }

    fn put_body(&mut self, hash: Hash, body: &BlockBody) -> Result<(), StorageError> {
        self.ops.push(Op::PutBody(hash, body.clone()));
        Ok(())
    }

    fn put_receipts(
        &mut self,
        hash: Hash,
        receipts: &[TransactionReceipt],
    ) -> Result<(), StorageError> {
        self.ops.push(Op::PutReceipts(hash, receipts.to_vec()));
        Ok(())
    }

    fn put_td(&mut self, hash: Hash, td: Difficulty) -> Result<(), StorageError> {
        self.ops.push(Op::PutTd(hash, td));
        Ok(())
    }

    fn put_hash(&mut self, number: BlockNumber, hash: Hash) -> Result<(), StorageError> {
        self.ops.push(Op::PutHash(number, hash));
        Ok(())
    }

    fn remove_hash(&mut self, number: BlockNumber) -> Result<(), StorageError> {
        self.ops.push(Op::RemoveHash(number));
        Ok(())
    }

    fn put_tx_location(
        &mut self,
        tx_hash: Hash,
        location: TransactionLocation,
    ) -> Result<(), StorageError> {
        self.ops.push(Op::PutTxLocation(tx_hash, location));
        Ok(())
    }

    fn remove_tx_location(&mut self, tx_hash: Hash) -> Result<(), StorageError> {
        self.ops.push(Op::RemoveTxLocation(tx_hash));
        Ok(())
    }

    fn set_chain_head(&mut self, hash: Hash) -> Result<(), StorageError> {
        self.ops.push(Op::SetChainHead(hash));
        Ok(())
    }

    fn set_fork_heads(&mut self, heads: &HashSet<Hash>) -> Result<(), StorageError> {
        self.ops.push(Op::SetForkHeads(heads.clone()));
        Ok(())
    }

    fn commit(self) -> Result<(), StorageError> {
        let mut state = self.backend.state.write();
        for op in self.ops {
            match op {
                Op::PutHeader(hash, header) => {
                    state.headers.insert(hash, header);
                }
                Op::PutBody(hash, body) => {
                    state.bodies.insert(hash, body);
                }
                Op::PutReceipts(hash, receipts) => {
                    state.receipts.insert(hash, receipts);
                }
                Op::PutTd(hash, td) => {
                    state.tds.insert(hash, td);
                }
                Op::PutHash(number, hash) => {
                    state.num_to_hash.insert(number, hash);
                }
                Op::RemoveHash(number) => {
                    state.num_to_hash.remove(&number);
                }
                Op::PutTxLocation(tx_hash, location) => {
                    state.tx_locations.insert(tx_hash, location);
                }
                Op::RemoveTxLocation(tx_hash) => {
                    state.tx_locations.remove(&tx_hash);
                }
                Op::SetChainHead(hash) => {
                    state.chain_head = Some(hash);
                }
                Op::SetForkHeads(heads) => {
                    state.fork_heads = heads;
                }
            }
        }
        Ok(())
    }

    fn rollback(self) {
        // Buffered ops are simply dropped; nothing was ever visible.
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
        let backend = MemoryBackend::new();
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
        let backend = MemoryBackend::new();
        let h = header(1, Hash::ZERO, 5);
        let hash = h.hash();

        let mut updater = backend.updater().unwrap();
        updater.put_header(hash, &h).unwrap();
        updater.put_hash(1, hash).unwrap();
        updater.commit().unwrap();

        assert_eq!(backend.get_header(hash).unwrap().unwrap().number, 1);
        assert_eq!(backend.get_hash(1).unwrap(), Some(hash));
    }

    #[test]
    fn clone_shares_underlying_state() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        let h = header(1, Hash::ZERO, 5);
        let hash = h.hash();

        let mut updater = backend.updater().unwrap();
        updater.put_header(hash, &h).unwrap();
        updater.commit().unwrap();

        assert_eq!(clone.get_header(hash).unwrap().unwrap().number, 1);
    }
}
