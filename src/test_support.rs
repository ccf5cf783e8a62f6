//! Block/header builders shared by this crate's own test modules (C9).
//! Also available to downstream embedders under the `test-utils` feature.
//!
//! Grounded on the sample `TestFactory`/`setup()` helpers in
//! `crates/executor/src/blockchain_tree/mod.rs`'s test module: small,
//! deterministic builders instead of a fuzzing harness, since the engine's
//! behavior is defined over an explicit finite set of topologies (spec §8).

use crate::primitives::{Block, BlockBody, BlockHeader, Difficulty, Hash, Transaction};
#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static TRACING_INIT: Once = Once::new();

/// Install a `tracing-subscriber` fmt layer for test output, once per
/// process. Safe to call from every test; later calls are no-ops.
///
/// `tracing-subscriber` is a dev-dependency, so this helper is only
/// available to this crate's own tests, not to `test-utils` embedders.
#[cfg(test)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a block at `number` on top of `parent`, with `difficulty` and the
/// given transaction payloads.
pub fn block(number: u64, parent: Hash, difficulty: u64, tx_payloads: &[&[u8]]) -> Block {
    let transactions =
        tx_payloads.iter().map(|payload| Transaction { payload: payload.to_vec() }).collect();
    Block {
        header: BlockHeader {
            number,
            parent_hash: parent,
            difficulty: Difficulty::from_u64(difficulty),
            timestamp: number,
            extra: Vec::new(),
        },
        body: BlockBody { transactions, ommers: Vec::new() },
    }
}

/// Build a genesis block (`number == 0`, parent `Hash::ZERO`).
pub fn genesis(difficulty: u64) -> Block {
    block(0, Hash::ZERO, difficulty, &[])
}

/// One receipt per transaction in `block`, with matching opaque payloads.
pub fn receipts_for(block: &Block) -> Vec<crate::primitives::TransactionReceipt> {
    block
        .body
        .transactions
        .iter()
        .map(|tx| crate::primitives::TransactionReceipt { payload: tx.payload.clone() })
        .collect()
}
