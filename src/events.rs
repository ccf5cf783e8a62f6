//! Tagged event variants published by the chain engine (C3).

use crate::primitives::{Block, Hash, Transaction};

/// An event emitted after a committed `append`.
///
/// Exactly one event is emitted per `append` call that actually changes
/// state (idempotent re-appends of an already-known block emit none, spec
/// §7).
#[derive(Clone, Debug)]
pub enum ChainEvent {
    /// `block` extends the canonical tip directly.
    HeadAdvanced {
        /// The newly canonical block.
        block: Block,
    },

    /// `block` was accepted but landed on a side chain.
    Fork {
        /// The new (or extended) fork-head block.
        block: Block,
    },

    /// The canonical chain switched to a different tip.
    ChainReorg {
        /// The new canonical tip.
        new_head: Hash,
        /// Transactions newly canonical, in ancestor-to-tip order.
        added_transactions: Vec<Transaction>,
        /// Transactions demoted off the canonical chain, in the order they
        /// were walked back from the old tip.
        removed_transactions: Vec<Transaction>,
    },
}
