//! Duration-based admission filtering
//!
//! High-frequency categories would swamp the output if every instance were
//! recorded standalone, so each category may carry a minimum duration.
//! Events below it are folded into their parent's aggregate statistics
//! instead of being emitted as standalone records. The filter answers that
//! admit-or-fold question on the hot path, so thresholds are flattened out
//! of the registry into a dense per-category array at construction.
//!
//! The filter itself is stateless: the session-wide full-recording override
//! is owned by the coordinator and passed in per call.

use crate::category::{CategoryId, CategoryRegistry};
use std::time::Duration;

/// Hot-path admission predicate over per-category duration thresholds.
#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    /// Threshold in nanoseconds per category index. `None` admits all.
    thresholds: [Option<u64>; CategoryId::COUNT],
}

impl AdmissionFilter {
    /// Flatten the registry's thresholds into a dense lookup array.
    pub fn new(registry: &CategoryRegistry) -> Self {
        let mut thresholds = [None; CategoryId::COUNT];
        for category in registry.categories() {
            thresholds[category.id.index()] = category
                .admission_threshold
                .map(|threshold| threshold.as_nanos() as u64);
        }
        Self { thresholds }
    }

    /// Whether a completed event should be recorded standalone.
    ///
    /// An event is admitted when the override is active, when its category
    /// has no threshold, or when its duration reaches the threshold. The
    /// comparison is inclusive: an event exactly at the threshold is
    /// admitted.
    pub fn should_emit_standalone(
        &self,
        category: CategoryId,
        duration_nanos: u64,
        full_recording: bool,
    ) -> bool {
        if full_recording {
            return true;
        }
        match self.thresholds[category.index()] {
            None => true,
            Some(threshold) => duration_nanos >= threshold,
        }
    }

    /// Threshold for a category, if it has one.
    pub fn threshold(&self, category: CategoryId) -> Option<Duration> {
        self.thresholds[category.index()].map(Duration::from_nanos)
    }
}
