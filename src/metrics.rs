//! Two observable gauges driven by pure reads of chain-head state (C7).
//!
//! The metrics framework is an injected collaborator, not part of the core
//! (spec §6/§9): this module only registers and updates the two named
//! gauges through the `metrics` facade crate; wiring a concrete recorder
//! (Prometheus, StatsD, ...) is the embedder's job.

use crate::primitives::{ChainHead, Difficulty};
use metrics::{gauge, Gauge};

const METRIC_HEIGHT: &str = "blockchain.height";
const METRIC_DIFFICULTY_TOTAL: &str = "blockchain.difficulty_total";

/// Handle to the two chain-index gauges.
pub struct ChainMetrics {
    height: Gauge,
    difficulty_total: Gauge,
}

impl ChainMetrics {
    /// Register both gauges with the currently installed `metrics`
    /// recorder.
    pub fn new() -> Self {
        Self { height: gauge!(METRIC_HEIGHT), difficulty_total: gauge!(METRIC_DIFFICULTY_TOTAL) }
    }

    /// Update both gauges from the current chain head.
    pub fn record(&self, head: ChainHead, number: u64) {
        self.height.set(number as f64);
        self.difficulty_total.set(difficulty_as_f64(head.total_difficulty));
    }
}

impl Default for ChainMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// `U256` has no lossless `f64` conversion; gauges are inherently lossy for
/// very large difficulties, so we saturate rather than panic.
fn difficulty_as_f64(difficulty: Difficulty) -> f64 {
    let limbs = (difficulty.0).0;
    let mut value = 0f64;
    for limb in limbs.iter().rev() {
        value = value * (u64::MAX as f64 + 1.0) + (*limb as f64);
    }
    value
}
