//! Observer registry (C4): subscribe/unsubscribe plus synchronous fan-out
//! of [`ChainEvent`]s.
//!
//! Grounded on grin's `ChainAdapter` trait (`chain/src/chain.rs`): a small
//! trait invoked synchronously from inside the chain's write path, rather
//! than through an async channel, so event order matches commit order
//! exactly (spec §5, §9 — "asynchronous dispatch would ... break
//! P-ordering").

use crate::engine::ChainEngine;
use crate::events::ChainEvent;
use crate::storage::Database;

/// Identifies one call to [`ChainEngine::subscribe`]. Monotonically
/// increasing; never reused within a single engine's lifetime.
pub type SubscriptionId = u64;

/// Implemented by anything that wants to react to committed chain events.
///
/// `on_event` runs synchronously, on the writer's own call stack, while the
/// engine's write lock is held (spec §5). A failing observer must not be
/// allowed to poison the writer: return `Err` and the registry logs and
/// continues to the next subscriber (spec §4.3, §7).
pub trait ChainObserver<S: Database>: Send + Sync {
    /// React to `event`. `engine` may be used for further (lock-free) reads.
    fn on_event(
        &self,
        event: &ChainEvent,
        engine: &ChainEngine<S>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub(crate) struct ObserverRegistry<S: Database> {
    next_id: SubscriptionId,
    subscribers: Vec<(SubscriptionId, Box<dyn ChainObserver<S>>)>,
}

impl<S: Database> ObserverRegistry<S> {
    pub fn new() -> Self {
        Self { next_id: 0, subscribers: Vec::new() }
    }

    pub fn subscribe(&mut self, observer: Box<dyn ChainObserver<S>>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Invoke every current subscriber with `event`. Order across
    /// subscribers is unspecified but stable within this one call (spec
    /// §4.3).
    pub fn notify(&self, event: &ChainEvent, engine: &ChainEngine<S>) {
        for (id, observer) in &self.subscribers {
            if let Err(error) = observer.on_event(event, engine) {
                tracing::warn!(
                    subscription_id = id,
                    event = event_kind(event),
                    %error,
                    "chain observer failed; event delivery continues"
                );
            }
        }
    }
}

fn event_kind(event: &ChainEvent) -> &'static str {
    match event {
        ChainEvent::HeadAdvanced { .. } => "head_advanced",
        ChainEvent::Fork { .. } => "fork",
        ChainEvent::ChainReorg { .. } => "chain_reorg",
    }
}
