//! Bounded retention of the slowest event instances
//!
//! For a handful of categories the interesting question is not "how many"
//! but "which were the worst": the slowest VFS reads, the slowest remote
//! queue waits. [`SlowestTracker`] keeps the K slowest instances of one
//! category in bounded memory, and [`SlowestTable`] groups one tracker per
//! tracked category behind per-category locks.
//!
//! # Algorithm
//!
//! The tracker is a min-heap over retained entries, ordered primarily by
//! duration. While fewer than K entries are held, every offer is retained,
//! whatever its duration. Once full, an offer is retained only when it is
//! strictly slower than the current weakest entry, which it then replaces
//! in place. The replace is done through [`std::collections::binary_heap::PeekMut`],
//! so the heap re-sifts once and never grows past K entries. Each offer is
//! O(log K) worst case and allocation-free except for the retained
//! description.
//!
//! Ties lose: an offer whose duration equals the weakest retained duration
//! is discarded, so among equally slow events the earliest observed wins.
//! The same preference applies inside the heap, where the eviction
//! candidate among equal durations is the latest-observed entry.

use crate::category::{CategoryId, CategoryRegistry};
use crate::error::{ProfileError, Result};
use crate::event::TimedEvent;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Mutex, PoisonError};

/// One retained slow event, as reported by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowEventRecord {
    /// Position in the snapshot, 1 for the slowest.
    pub rank: usize,
    /// Category the event belongs to.
    pub category: CategoryId,
    /// Start time in nanoseconds since the session clock origin.
    pub start_nanos: u64,
    /// Elapsed wall time in nanoseconds.
    pub duration_nanos: u64,
    /// What the event operated on.
    pub description: String,
}

/// Heap entry. Ordering puts the eviction candidate at the heap minimum:
/// shortest duration first, and among equal durations the latest start,
/// then the latest observation.
#[derive(Debug, Clone)]
struct Retained {
    duration_nanos: u64,
    start_nanos: u64,
    /// Observation order within the tracker, unique per entry.
    seq: u64,
    description: String,
}

impl Ord for Retained {
    fn cmp(&self, other: &Self) -> Ordering {
        self.duration_nanos
            .cmp(&other.duration_nanos)
            .then_with(|| other.start_nanos.cmp(&self.start_nanos))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Retained {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Retained {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Retained {}

/// Keeps the K slowest instances of one category.
#[derive(Debug)]
pub struct SlowestTracker {
    category: CategoryId,
    capacity: usize,
    heap: BinaryHeap<Reverse<Retained>>,
    next_seq: u64,
}

impl SlowestTracker {
    /// Create a tracker retaining at most `capacity` instances.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Categories that retain nothing get no
    /// tracker at all; constructing one for them is a defect in the caller.
    pub fn new(category: CategoryId, capacity: usize) -> Self {
        assert!(capacity > 0, "tracker capacity must be non-zero");
        Self {
            category,
            capacity,
            // One extra slot so a replace never reallocates.
            heap: BinaryHeap::with_capacity(capacity + 1),
            next_seq: 0,
        }
    }

    /// Offer a completed event for retention.
    ///
    /// Returns `true` if the event was retained. Below capacity every offer
    /// is retained; at capacity the event must be strictly slower than the
    /// weakest retained entry, which it replaces.
    pub fn offer(&mut self, event: &TimedEvent) -> bool {
        if self.heap.len() < self.capacity {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.heap.push(Reverse(Retained {
                duration_nanos: event.duration_nanos,
                start_nanos: event.start_nanos,
                seq,
                description: event.description.clone(),
            }));
            return true;
        }
        match self.heap.peek_mut() {
            Some(mut weakest) if event.duration_nanos > weakest.0.duration_nanos => {
                let seq = self.next_seq;
                self.next_seq += 1;
                weakest.0 = Retained {
                    duration_nanos: event.duration_nanos,
                    start_nanos: event.start_nanos,
                    seq,
                    description: event.description.clone(),
                };
                true
            }
            _ => false,
        }
    }

    /// Ranked view of the retained events, slowest first.
    ///
    /// Equal durations are ordered by earlier start time, then by earlier
    /// observation. Ranks are contiguous from 1. The tracker is unchanged;
    /// repeated snapshots without intervening offers are identical.
    pub fn snapshot(&self) -> Vec<SlowEventRecord> {
        let mut entries: Vec<&Retained> = self.heap.iter().map(|Reverse(entry)| entry).collect();
        entries.sort_by(|a, b| {
            b.duration_nanos
                .cmp(&a.duration_nanos)
                .then_with(|| a.start_nanos.cmp(&b.start_nanos))
                .then_with(|| a.seq.cmp(&b.seq))
        });
        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| SlowEventRecord {
                rank: index + 1,
                category: self.category,
                start_nanos: entry.start_nanos,
                duration_nanos: entry.duration_nanos,
                description: entry.description.clone(),
            })
            .collect()
    }

    /// Drop all retained events and restart observation numbering.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }

    /// Number of currently retained events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Per-category slow-event trackers behind per-category locks.
///
/// Offers and snapshots for one category are linearized by that category's
/// lock, so concurrent offers never lose updates and a snapshot observes a
/// consistent state. Operations on different categories never contend.
/// Whole-table operations take the locks one category at a time and never
/// hold two at once.
#[derive(Debug)]
pub struct SlowestTable {
    /// Indexed by `CategoryId::index()`. `None` for categories that retain
    /// nothing.
    slots: Vec<Option<Mutex<SlowestTracker>>>,
}

impl SlowestTable {
    /// Build one tracker per category with a non-zero retention capacity.
    pub fn new(registry: &CategoryRegistry) -> Self {
        let slots = registry
            .categories()
            .map(|category| {
                if category.collects_slowest_instances() {
                    Some(Mutex::new(SlowestTracker::new(
                        category.id,
                        category.slow_retention_capacity,
                    )))
                } else {
                    None
                }
            })
            .collect();
        Self { slots }
    }

    /// Offer an event to its category's tracker.
    ///
    /// Returns `Ok(true)` if retained, `Ok(false)` if discarded, and
    /// [`ProfileError::MisroutedEvent`] if the category retains nothing.
    pub fn offer(&self, event: &TimedEvent) -> Result<bool> {
        match &self.slots[event.category.index()] {
            Some(slot) => {
                let mut tracker = slot.lock().unwrap_or_else(PoisonError::into_inner);
                Ok(tracker.offer(event))
            }
            None => Err(ProfileError::MisroutedEvent {
                category: event.category,
            }),
        }
    }

    /// Ranked snapshot for one category.
    ///
    /// Categories that retain nothing yield an empty snapshot; asking is
    /// not an error.
    pub fn snapshot(&self, category: CategoryId) -> Vec<SlowEventRecord> {
        match &self.slots[category.index()] {
            Some(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .snapshot(),
            None => Vec::new(),
        }
    }

    /// Merged snapshot across all tracked categories, slowest first.
    ///
    /// Ranks are reassigned over the merged order. Category snapshots are
    /// taken one lock at a time, so the merge is consistent per category
    /// but not across categories.
    pub fn snapshot_all(&self) -> Vec<SlowEventRecord> {
        let mut merged: Vec<SlowEventRecord> = self
            .tracked_categories()
            .flat_map(|category| self.snapshot(category))
            .collect();
        merged.sort_by(|a, b| {
            b.duration_nanos
                .cmp(&a.duration_nanos)
                .then_with(|| a.start_nanos.cmp(&b.start_nanos))
                .then_with(|| a.category.cmp(&b.category))
        });
        for (index, record) in merged.iter_mut().enumerate() {
            record.rank = index + 1;
        }
        merged
    }

    /// Drop everything retained for one category. A no-op for categories
    /// that retain nothing.
    pub fn reset(&self, category: CategoryId) {
        if let Some(slot) = &self.slots[category.index()] {
            slot.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Drop everything retained in every tracker.
    pub fn reset_all(&self) {
        for slot in self.slots.iter().flatten() {
            slot.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Categories that have a tracker, in declaration order.
    pub fn tracked_categories(&self) -> impl Iterator<Item = CategoryId> + '_ {
        CategoryId::ALL
            .into_iter()
            .filter(|category| self.slots[category.index()].is_some())
    }

    /// Whether a category has a tracker.
    pub fn tracks(&self, category: CategoryId) -> bool {
        self.slots[category.index()].is_some()
    }
}
