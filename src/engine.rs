//! Chain engine (C5): genesis install, block append, fork handling, reorg
//! walk and canonical indexing.
//!
//! This is the generalization of the teacher's `BlockchainTree`
//! (`crates/executor/src/blockchain_tree/mod.rs`): where the teacher keeps
//! a forest of in-memory `Chain`s behind a finalization window because it
//! must defer committing sidechains until they are provably final, this
//! engine has no execution layer and no finalization window — the backing
//! store already holds every known block, so "becoming canonical" is just
//! rewriting the `NUM2HASH`/`TXLOC` indices and the `FORK_HEADS` set
//! in-place (spec §4.2.3) rather than moving blocks between in-memory tree
//! nodes and the database.

use crate::error::{ChainError, ChainResult};
use crate::events::ChainEvent;
use crate::metrics::ChainMetrics;
use crate::observer::{ChainObserver, ObserverRegistry, SubscriptionId};
use crate::primitives::{
    Block, BlockBody, BlockHeader, BlockNumber, ChainHead, Difficulty, Hash, Transaction,
    TransactionLocation, TransactionReceipt,
};
use crate::storage::{Database, DatabaseUpdater};
use parking_lot::Mutex;
use std::collections::HashSet;

/// The mutable blockchain index: accepts validated blocks and receipts,
/// persists them, and maintains the canonical chain over a pluggable
/// [`Database`] backend `S`.
pub struct ChainEngine<S: Database> {
    storage: S,
    write_lock: Mutex<ObserverRegistry<S>>,
    metrics: ChainMetrics,
}

impl<S: Database> ChainEngine<S> {
    /// Install or verify genesis against `storage`, then construct the
    /// engine (spec §4.2.1).
    ///
    /// Fails with [`ChainError::InvalidGenesis`] if `storage` was already
    /// initialized with a different genesis, or if `genesis.number() != 0`.
    /// Fails with [`ChainError::DataCorruption`] if `storage` has a chain
    /// head but no recorded genesis row.
    pub fn new(genesis: Block, storage: S) -> ChainResult<Self> {
        if genesis.number() != 0 {
            return Err(ChainError::InvalidGenesis("genesis block must have number 0".into()));
        }

        let span = tracing::info_span!("genesis_install", hash = %genesis.hash());
        let _enter = span.enter();

        match storage.get_chain_head()? {
            None => {
                let hash = genesis.hash();
                let mut updater = storage.updater()?;
                updater.put_header(hash, &genesis.header)?;
                updater.put_body(hash, &genesis.body)?;
                updater.put_receipts(hash, &[])?;
                updater.put_td(hash, genesis.difficulty())?;
                updater.put_hash(0, hash)?;
                updater.set_chain_head(hash)?;
                updater.commit()?;
                tracing::info!("installed genesis");
            }
            Some(_) => {
                let stored_genesis = storage.get_hash(0)?.ok_or_else(|| {
                    ChainError::DataCorruption(
                        "storage has a chain head but no genesis number-to-hash row".into(),
                    )
                })?;
                if stored_genesis != genesis.hash() {
                    return Err(ChainError::InvalidGenesis(format!(
                        "datastore was initialized with genesis {stored_genesis}, not {}",
                        genesis.hash()
                    )));
                }
                tracing::info!("verified existing genesis");
            }
        }

        let engine =
            Self { storage, write_lock: Mutex::new(ObserverRegistry::new()), metrics: ChainMetrics::new() };
        engine.record_metrics();
        Ok(engine)
    }

    /// Current canonical tip, with its total difficulty.
    pub fn chain_head(&self) -> ChainHead {
        let hash = self
            .storage
            .get_chain_head()
            .expect("storage read failed while reading chain head")
            .expect("chain head is set once genesis has been installed");
        let total_difficulty = self
            .storage
            .get_td(hash)
            .expect("storage read failed while reading chain head total difficulty")
            .expect("chain head total difficulty is recorded alongside every header");
        ChainHead { hash, total_difficulty }
    }

    /// Hash of the current canonical tip.
    pub fn chain_head_hash(&self) -> Hash {
        self.chain_head().hash
    }

    /// Height of the current canonical tip.
    pub fn chain_head_number(&self) -> BlockNumber {
        self.header_by_hash(self.chain_head_hash())
            .expect("storage read failed while reading chain head header")
            .expect("chain head header is recorded alongside the chain head pointer")
            .number
    }

    /// Header at canonical height `number`, if any.
    pub fn header_by_number(&self, number: BlockNumber) -> ChainResult<Option<BlockHeader>> {
        match self.storage.get_hash(number)? {
            Some(hash) => self.header_by_hash(hash),
            None => Ok(None),
        }
    }

    /// Header with the given hash, canonical or not.
    pub fn header_by_hash(&self, hash: Hash) -> ChainResult<Option<BlockHeader>> {
        Ok(self.storage.get_header(hash)?)
    }

    /// Body with the given hash, canonical or not.
    pub fn body(&self, hash: Hash) -> ChainResult<Option<BlockBody>> {
        Ok(self.storage.get_body(hash)?)
    }

    /// Receipts for the block with the given hash, canonical or not.
    pub fn receipts(&self, hash: Hash) -> ChainResult<Option<Vec<TransactionReceipt>>> {
        Ok(self.storage.get_receipts(hash)?)
    }

    /// Canonical hash at height `number`.
    pub fn hash_by_number(&self, number: BlockNumber) -> ChainResult<Option<Hash>> {
        Ok(self.storage.get_hash(number)?)
    }

    /// Total difficulty of the block with the given hash.
    pub fn td(&self, hash: Hash) -> ChainResult<Option<Difficulty>> {
        Ok(self.storage.get_td(hash)?)
    }

    /// Resolve a transaction by hash. Only canonical transactions are
    /// findable (spec §4.2).
    pub fn transaction(&self, tx_hash: Hash) -> ChainResult<Option<Transaction>> {
        let Some(location) = self.storage.get_tx_location(tx_hash)? else {
            return Ok(None);
        };
        let Some(body) = self.storage.get_body(location.block_hash)? else {
            return Ok(None);
        };
        Ok(body.transactions.into_iter().nth(location.index as usize))
    }

    /// Canonical location of a transaction, if it has one.
    pub fn transaction_location(&self, tx_hash: Hash) -> ChainResult<Option<TransactionLocation>> {
        Ok(self.storage.get_tx_location(tx_hash)?)
    }

    /// Currently tracked fork heads (test hook, spec §4.2).
    pub fn forks(&self) -> ChainResult<HashSet<Hash>> {
        Ok(self.storage.get_fork_heads()?)
    }

    /// Register an observer; returns its [`SubscriptionId`].
    pub fn subscribe(&self, observer: Box<dyn ChainObserver<S>>) -> SubscriptionId {
        self.write_lock.lock().subscribe(observer)
    }

    /// Remove a previously registered observer. Returns whether an entry
    /// was actually removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.write_lock.lock().unsubscribe(id)
    }

    /// Append a validated block with its execution receipts (spec §4.2.2).
    ///
    /// Idempotent: re-appending an already-known block is a silent no-op
    /// that emits no event (spec §7).
    pub fn append(&self, block: Block, receipts: Vec<TransactionReceipt>) -> ChainResult<()> {
        let hash = block.hash();
        let span = tracing::info_span!("append", %hash, number = block.number());
        let _enter = span.enter();

        if receipts.len() != block.body.transactions.len() {
            return Err(ChainError::ArgumentError {
                expected: block.body.transactions.len(),
                got: receipts.len(),
            });
        }

        let mut registry = self.write_lock.lock();

        if self.storage.get_header(hash)?.is_some() {
            tracing::debug!("block already known; append is a no-op");
            return Ok(());
        }

        let parent_hash = block.parent_hash();
        if self.storage.get_header(parent_hash)?.is_none() {
            return Err(ChainError::DisconnectedBlock { block: hash, parent: parent_hash });
        }
        let parent_td = self.storage.get_td(parent_hash)?.ok_or_else(|| {
            ChainError::DataCorruption(format!(
                "missing total difficulty for parent {parent_hash}"
            ))
        })?;
        let td = parent_td.saturating_add(block.difficulty());

        let mut updater = self.storage.updater()?;
        updater.put_header(hash, &block.header)?;
        updater.put_body(hash, &block.body)?;
        updater.put_receipts(hash, &receipts)?;
        updater.put_td(hash, td)?;

        let current_head_hash = self
            .storage
            .get_chain_head()?
            .expect("genesis is installed by the time append is reachable");
        let current_head_td = self
            .storage
            .get_td(current_head_hash)?
            .expect("chain head total difficulty is recorded");

        let outcome = if parent_hash == current_head_hash {
            tracing::info!("classified block as advance");
            self.apply_advance(&mut updater, &block)
        } else if td > current_head_td {
            tracing::info!(%current_head_hash, "classified block as reorg");
            self.apply_reorg(&mut updater, current_head_hash, &block)
        } else {
            tracing::info!("classified block as fork");
            self.apply_fork(&mut updater, &block)
        };

        let event = match outcome {
            Ok(event) => event,
            Err(error) => {
                updater.rollback();
                return Err(error);
            }
        };

        updater.commit()?;
        self.record_metrics();
        registry.notify(&event, self);

        Ok(())
    }

    fn apply_advance(&self, updater: &mut S::Updater<'_>, block: &Block) -> ChainResult<ChainEvent> {
        updater.put_hash(block.number(), block.hash())?;
        updater.set_chain_head(block.hash())?;
        for (index, tx) in block.body.transactions.iter().enumerate() {
            updater.put_tx_location(
                tx.hash(),
                TransactionLocation { block_hash: block.hash(), index: index as u32 },
            )?;
        }
        Ok(ChainEvent::HeadAdvanced { block: block.clone() })
    }

    fn apply_fork(&self, updater: &mut S::Updater<'_>, block: &Block) -> ChainResult<ChainEvent> {
        let mut fork_heads = self.storage.get_fork_heads()?;
        fork_heads.remove(&block.parent_hash());
        fork_heads.insert(block.hash());
        updater.set_fork_heads(&fork_heads)?;
        Ok(ChainEvent::Fork { block: block.clone() })
    }

    /// Reorg walk of spec §4.2.3: `old_head_hash` is the chain head being
    /// demoted, `new_block` the just-appended block that now wins on total
    /// difficulty.
    fn apply_reorg(
        &self,
        updater: &mut S::Updater<'_>,
        old_head_hash: Hash,
        new_block: &Block,
    ) -> ChainResult<ChainEvent> {
        updater.set_chain_head(new_block.hash())?;

        // Blocks that become canonical, tip-to-ancestor order for now;
        // reversed to ancestor->tip once the walk completes.
        let mut added_by_block: Vec<(Hash, Vec<Transaction>)> = Vec::new();
        // Transactions demoted off the canonical chain, in the order they
        // are walked back from the old tip.
        let mut removed: Vec<Transaction> = Vec::new();

        let mut n_hash = new_block.hash();
        let mut n_number = new_block.number();
        let mut n_parent = new_block.parent_hash();
        let mut n_txs = new_block.body.transactions.clone();

        let mut o_hash = old_head_hash;
        let mut o_header = self.require_header(o_hash)?;
        let mut o_number = o_header.number;

        tracing::debug!(new_height = n_number, old_height = o_number, "reorg phase A: lowering new head");
        while n_number > o_number {
            updater.put_hash(n_number, n_hash)?;
            added_by_block.push((n_hash, n_txs.clone()));

            let parent_header = self.require_header(n_parent)?;
            let parent_body = self.require_body(n_parent)?;
            n_hash = n_parent;
            n_number = parent_header.number;
            n_parent = parent_header.parent_hash;
            n_txs = parent_body.transactions;
        }

        tracing::debug!(old_height = o_number, new_height = n_number, "reorg phase B: lowering old head");
        while o_number > n_number {
            updater.remove_hash(o_number)?;
            removed.extend(self.require_body(o_hash)?.transactions);

            let parent_hash = o_header.parent_hash;
            o_header = self.require_header(parent_hash)?;
            o_hash = parent_hash;
            o_number = o_header.number;
        }

        tracing::debug!("reorg phase C: walking to common ancestor");
        while o_hash != n_hash {
            updater.put_hash(n_number, n_hash)?;
            added_by_block.push((n_hash, n_txs.clone()));
            removed.extend(self.require_body(o_hash)?.transactions);

            let n_parent_header = self.require_header(n_parent)?;
            let n_parent_body = self.require_body(n_parent)?;
            n_hash = n_parent;
            n_number = n_parent_header.number;
            n_parent = n_parent_header.parent_hash;
            n_txs = n_parent_body.transactions;

            let o_parent_hash = o_header.parent_hash;
            o_header = self.require_header(o_parent_hash)?;
            o_hash = o_parent_hash;
        }

        // Ancestor -> tip order, per spec §4.2.3 step 8.
        added_by_block.reverse();

        let added_hashes: HashSet<Hash> =
            added_by_block.iter().flat_map(|(_, txs)| txs.iter().map(Transaction::hash)).collect();

        for (block_hash, txs) in &added_by_block {
            for (index, tx) in txs.iter().enumerate() {
                updater.put_tx_location(
                    tx.hash(),
                    TransactionLocation { block_hash: *block_hash, index: index as u32 },
                )?;
            }
        }

        // A transaction that reappears on the new canonical chain must not
        // be de-indexed (spec §4.2.3 step 6).
        removed.retain(|tx| !added_hashes.contains(&tx.hash()));
        for tx in &removed {
            updater.remove_tx_location(tx.hash())?;
        }

        let mut fork_heads = self.storage.get_fork_heads()?;
        fork_heads.insert(old_head_hash);
        fork_heads.remove(&new_block.parent_hash());
        updater.set_fork_heads(&fork_heads)?;

        let added_transactions =
            added_by_block.into_iter().flat_map(|(_, txs)| txs.into_iter()).collect();

        Ok(ChainEvent::ChainReorg {
            new_head: new_block.hash(),
            added_transactions,
            removed_transactions: removed,
        })
    }

    fn require_header(&self, hash: Hash) -> ChainResult<BlockHeader> {
        self.storage
            .get_header(hash)?
            .ok_or_else(|| ChainError::DataCorruption(format!("missing header for {hash}")))
    }

    fn require_body(&self, hash: Hash) -> ChainResult<BlockBody> {
        self.storage
            .get_body(hash)?
            .ok_or_else(|| ChainError::DataCorruption(format!("missing body for {hash}")))
    }

    fn record_metrics(&self) {
        let head = self.chain_head();
        let number = self.chain_head_number();
        self.metrics.record(head, number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryBackend;
    use crate::test_support::{block, genesis, init_tracing, receipts_for};
    use assert_matches::assert_matches;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<StdMutex<Vec<ChainEvent>>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<ChainEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ChainObserver<MemoryBackend> for Recorder {
        fn on_event(
            &self,
            event: &ChainEvent,
            _engine: &ChainEngine<MemoryBackend>,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn new_engine(genesis_difficulty: u64) -> ChainEngine<MemoryBackend> {
        init_tracing();
        ChainEngine::new(genesis(genesis_difficulty), MemoryBackend::new()).unwrap()
    }

    #[test]
    fn genesis_only_chain_head_is_genesis() {
        let engine = new_engine(1);
        assert_eq!(engine.chain_head_number(), 0);
        assert_eq!(engine.chain_head_hash(), engine.header_by_number(0).unwrap().unwrap().hash());
        assert!(engine.forks().unwrap().is_empty());
    }

    #[test]
    fn reopening_with_matching_genesis_succeeds() {
        let storage = MemoryBackend::new();
        let g = genesis(1);
        let _first = ChainEngine::new(g.clone(), storage.clone()).unwrap();
        assert!(ChainEngine::new(g, storage).is_ok());
    }

    #[test]
    fn reopening_with_different_genesis_fails() {
        let storage = MemoryBackend::new();
        let _first = ChainEngine::new(genesis(1), storage.clone()).unwrap();
        let error = ChainEngine::new(genesis(2), storage).unwrap_err();
        assert_matches!(error, ChainError::InvalidGenesis(_));
    }

    #[test]
    fn linear_advance_updates_head_and_emits_event() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();
        let recorder = Recorder::default();
        engine.subscribe(Box::new(recorder.clone()));

        let b1 = block(1, genesis_hash, 5, &[b"tx-1"]);
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();

        assert_eq!(engine.chain_head_hash(), b1.hash());
        assert_eq!(engine.chain_head_number(), 1);
        assert_eq!(engine.hash_by_number(1).unwrap(), Some(b1.hash()));

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_matches!(events[0], ChainEvent::HeadAdvanced { .. });

        let tx_hash = Transaction { payload: b"tx-1".to_vec() }.hash();
        let location = engine.transaction_location(tx_hash).unwrap().unwrap();
        assert_eq!(location, TransactionLocation { block_hash: b1.hash(), index: 0 });
        assert_eq!(engine.transaction(tx_hash).unwrap().unwrap().payload, b"tx-1".to_vec());
    }

    #[test]
    fn fork_without_reorg_keeps_incumbent_and_tracks_fork_head() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();
        let recorder = Recorder::default();
        engine.subscribe(Box::new(recorder.clone()));

        let b1 = block(1, genesis_hash, 10, &[]);
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();

        let alt = block(1, genesis_hash, 3, &[]);
        engine.append(alt.clone(), receipts_for(&alt)).unwrap();

        assert_eq!(engine.chain_head_hash(), b1.hash());
        assert_eq!(engine.forks().unwrap(), HashSet::from([alt.hash()]));

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_matches!(events[1], ChainEvent::Fork { .. });
    }

    #[test]
    fn fork_extension_replaces_the_tracked_fork_head() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();

        let b1 = block(1, genesis_hash, 10, &[]);
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();

        let alt1 = block(1, genesis_hash, 1, &[]);
        engine.append(alt1.clone(), receipts_for(&alt1)).unwrap();

        let alt2 = block(2, alt1.hash(), 1, &[]);
        engine.append(alt2.clone(), receipts_for(&alt2)).unwrap();

        assert_eq!(engine.chain_head_hash(), b1.hash());
        assert_eq!(engine.forks().unwrap(), HashSet::from([alt2.hash()]));
    }

    #[test]
    fn equal_total_difficulty_keeps_incumbent_head() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();

        let a1 = block(1, genesis_hash, 5, &[]);
        engine.append(a1.clone(), receipts_for(&a1)).unwrap();

        let b1 = block(1, genesis_hash, 5, &[b"tie-breaker"]);
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();

        assert_eq!(engine.chain_head_hash(), a1.hash());
        assert!(engine.forks().unwrap().contains(&b1.hash()));
    }

    #[test]
    fn reorg_switches_canonical_chain_and_reindexes_transactions() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();
        let recorder = Recorder::default();
        engine.subscribe(Box::new(recorder.clone()));

        let a1 = block(1, genesis_hash, 5, &[b"dup-tx"]);
        engine.append(a1.clone(), receipts_for(&a1)).unwrap();

        let c1 = block(1, genesis_hash, 2, &[]);
        engine.append(c1.clone(), receipts_for(&c1)).unwrap();

        let c2 = block(2, c1.hash(), 10, &[b"dup-tx"]);
        engine.append(c2.clone(), receipts_for(&c2)).unwrap();

        assert_eq!(engine.chain_head_hash(), c2.hash());
        assert_eq!(engine.header_by_number(1).unwrap().unwrap().hash(), c1.hash());
        assert_eq!(engine.header_by_number(2).unwrap().unwrap().hash(), c2.hash());
        assert!(engine.forks().unwrap().contains(&a1.hash()));

        // The duplicated transaction was demoted with `a1` and promoted
        // with `c2` in the same reorg; it must end up pointing at `c2`, not
        // unindexed.
        let dup_hash = Transaction { payload: b"dup-tx".to_vec() }.hash();
        let location = engine.transaction_location(dup_hash).unwrap().unwrap();
        assert_eq!(location.block_hash, c2.hash());

        let events = recorder.events();
        assert_eq!(events.len(), 3);
        assert_matches!(events[2], ChainEvent::ChainReorg { .. });
        if let ChainEvent::ChainReorg { new_head, added_transactions, removed_transactions } =
            &events[2]
        {
            assert_eq!(*new_head, c2.hash());
            assert_eq!(added_transactions.len(), 1);
            assert!(removed_transactions.is_empty());
        }
    }

    #[test]
    fn reorg_leaves_num2hash_exact_on_new_chain() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();

        let a1 = block(1, genesis_hash, 5, &[]);
        let a2 = block(2, a1.hash(), 5, &[]);
        let a3 = block(3, a2.hash(), 5, &[]);
        engine.append(a1.clone(), receipts_for(&a1)).unwrap();
        engine.append(a2.clone(), receipts_for(&a2)).unwrap();
        engine.append(a3.clone(), receipts_for(&a3)).unwrap();

        let b1 = block(1, genesis_hash, 1, &[]);
        let b2 = block(2, b1.hash(), 1, &[]);
        let b3 = block(3, b2.hash(), 1, &[]);
        let b4 = block(4, b3.hash(), 100, &[]);
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();
        engine.append(b2.clone(), receipts_for(&b2)).unwrap();
        engine.append(b3.clone(), receipts_for(&b3)).unwrap();
        engine.append(b4.clone(), receipts_for(&b4)).unwrap();

        assert_eq!(engine.chain_head_hash(), b4.hash());
        assert_eq!(engine.hash_by_number(0).unwrap(), Some(genesis_hash));
        assert_eq!(engine.hash_by_number(1).unwrap(), Some(b1.hash()));
        assert_eq!(engine.hash_by_number(2).unwrap(), Some(b2.hash()));
        assert_eq!(engine.hash_by_number(3).unwrap(), Some(b3.hash()));
        assert_eq!(engine.hash_by_number(4).unwrap(), Some(b4.hash()));

        let forks = engine.forks().unwrap();
        assert!(forks.contains(&a3.hash()));
        assert!(!forks.contains(&a1.hash()));
        assert!(!forks.contains(&a2.hash()));
    }

    #[test]
    fn reorg_to_shorter_but_heavier_chain_removes_stale_num2hash_rows() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();

        let a1 = block(1, genesis_hash, 5, &[]);
        let a2 = block(2, a1.hash(), 5, &[]);
        let a3 = block(3, a2.hash(), 5, &[]);
        engine.append(a1.clone(), receipts_for(&a1)).unwrap();
        engine.append(a2.clone(), receipts_for(&a2)).unwrap();
        engine.append(a3.clone(), receipts_for(&a3)).unwrap();
        assert_eq!(engine.chain_head_number(), 3);

        // A single block at height 1, heavy enough to outweigh the whole
        // three-block `a` chain (1 + 5 + 5 + 5 = 16).
        let heavy1 = block(1, genesis_hash, 50, &[]);
        engine.append(heavy1.clone(), receipts_for(&heavy1)).unwrap();

        assert_eq!(engine.chain_head_hash(), heavy1.hash());
        assert_eq!(engine.chain_head_number(), 1);
        assert_eq!(engine.hash_by_number(0).unwrap(), Some(genesis_hash));
        assert_eq!(engine.hash_by_number(1).unwrap(), Some(heavy1.hash()));
        // Phase B must have removed the stale higher-height rows left behind
        // by the demoted `a` chain; nothing should be canonical above the
        // new, shorter tip.
        assert_eq!(engine.hash_by_number(2).unwrap(), None);
        assert_eq!(engine.hash_by_number(3).unwrap(), None);

        let forks = engine.forks().unwrap();
        assert!(forks.contains(&a3.hash()));
    }

    #[test]
    fn stored_headers_round_trip_through_their_own_hash() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();

        let b1 = block(1, genesis_hash, 5, &[b"tx"]);
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();

        let stored = engine.header_by_hash(b1.hash()).unwrap().unwrap();
        assert_eq!(stored.hash(), b1.hash());
    }

    #[test]
    fn append_with_unknown_parent_is_rejected() {
        let engine = new_engine(1);
        let orphan = block(5, Hash::digest(b"nowhere"), 1, &[]);
        let error = engine.append(orphan.clone(), receipts_for(&orphan)).unwrap_err();
        assert_matches!(error, ChainError::DisconnectedBlock { .. });
    }

    #[test]
    fn append_with_mismatched_receipt_count_is_rejected() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();
        let b1 = block(1, genesis_hash, 1, &[b"tx"]);
        let error = engine.append(b1, vec![]).unwrap_err();
        assert_matches!(error, ChainError::ArgumentError { .. });
    }

    #[test]
    fn reappending_a_known_block_is_a_silent_no_op() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();
        let recorder = Recorder::default();
        engine.subscribe(Box::new(recorder.clone()));

        let b1 = block(1, genesis_hash, 5, &[]);
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();

        assert_eq!(recorder.events().len(), 1);
        assert_eq!(engine.chain_head_hash(), b1.hash());
    }

    #[test]
    fn unsubscribe_stops_future_notifications() {
        let engine = new_engine(1);
        let genesis_hash = engine.chain_head_hash();
        let recorder = Recorder::default();
        let id = engine.subscribe(Box::new(recorder.clone()));
        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));

        let b1 = block(1, genesis_hash, 5, &[]);
        engine.append(b1.clone(), receipts_for(&b1)).unwrap();
        assert!(recorder.events().is_empty());
    }
}
