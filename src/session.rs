//! Session coordination
//!
//! [`ProfileSession`] is the crate's front door. It owns one category
//! registry, one admission filter, and one slow-event table, and runs every
//! completed event through both halves of the pipeline: the admission
//! decision, which records the event standalone or folds it into aggregate
//! counts, and, independently, the slow-retention offer for categories that
//! track slow instances. All methods take `&self`, so a session wrapped in
//! an `Arc` can be recorded into from any number of worker threads.
//!
//! A session spans one profiled run. [`ProfileSession::begin_session`] and
//! [`ProfileSession::end_session`] bracket a run; both funnel into
//! [`ProfileSession::reset`], which drops all retained slow events and
//! zeroes the per-category counters. Recording threads are expected to be
//! quiet across those boundaries; a record racing a reset lands wholly
//! before or wholly after it within its category, never half of each.

use crate::admission::AdmissionFilter;
use crate::category::{CategoryId, CategoryRegistry};
use crate::error::Result;
use crate::event::TimedEvent;
use crate::slowest::{SlowEventRecord, SlowestTable};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Session-level recording options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Initial state of the full-recording override: record every event
    /// standalone, ignoring admission thresholds. Intended for deep-dive
    /// runs where output volume is acceptable. Toggleable later through
    /// [`ProfileSession::set_full_recording`].
    pub record_full_profiler_data: bool,
}

/// What happened to one recorded event.
///
/// Admission and slow retention are independent decisions: a folded event
/// still competes for retention while its category's tracker has room, and
/// an admitted event of an untracked category is never retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// The event was recorded standalone rather than folded into aggregates.
    pub emitted: bool,
    /// The event was retained among its category's slowest instances.
    pub retained: bool,
}

/// Per-category slice of a [`SessionSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySnapshot {
    /// Category these figures describe.
    pub category: CategoryId,
    /// Human-readable category description.
    pub description: &'static str,
    /// Events recorded standalone.
    pub emitted: u64,
    /// Events folded into aggregates by the admission filter.
    pub suppressed: u64,
    /// Ranked slowest instances, if the category retains any.
    pub slowest: Vec<SlowEventRecord>,
}

/// Point-in-time view of a session, one entry per category in declaration
/// order plus a merged ranking of the slowest events overall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub categories: Vec<CategorySnapshot>,
    pub slowest_overall: Vec<SlowEventRecord>,
}

impl SessionSummary {
    /// The slice for one category.
    pub fn category(&self, id: CategoryId) -> &CategorySnapshot {
        &self.categories[id.index()]
    }

    /// Standalone records across all categories.
    pub fn total_emitted(&self) -> u64 {
        self.categories.iter().map(|c| c.emitted).sum()
    }

    /// Folded events across all categories.
    pub fn total_suppressed(&self) -> u64 {
        self.categories.iter().map(|c| c.suppressed).sum()
    }
}

/// Thread-safe profiling session over a shared category registry.
///
/// # Example
///
/// ```
/// use demora::category::CategoryId;
/// use demora::event::TimedEvent;
/// use demora::session::{ProfileSession, SessionConfig};
///
/// let session = ProfileSession::new(SessionConfig::default());
/// let slow_read = TimedEvent::new(CategoryId::VfsRead, 0, 25_000_000, "/src/main.rs");
/// let outcome = session.record(&slow_read);
/// assert!(outcome.emitted && outcome.retained);
///
/// let summary = session.summary();
/// assert_eq!(summary.category(CategoryId::VfsRead).slowest[0].rank, 1);
/// ```
#[derive(Debug)]
pub struct ProfileSession {
    registry: Arc<CategoryRegistry>,
    filter: AdmissionFilter,
    slowest: SlowestTable,
    /// Session-wide override that bypasses admission thresholds.
    full_recording: AtomicBool,
    /// Standalone records per category index.
    emitted: Vec<AtomicU64>,
    /// Folded events per category index.
    suppressed: Vec<AtomicU64>,
}

impl ProfileSession {
    /// Create a session over the builtin category registry.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_registry(Arc::new(CategoryRegistry::builtin()), config)
    }

    /// Create a session over a shared registry handle.
    pub fn with_registry(registry: Arc<CategoryRegistry>, config: SessionConfig) -> Self {
        let filter = AdmissionFilter::new(&registry);
        let slowest = SlowestTable::new(&registry);
        let emitted = (0..registry.count()).map(|_| AtomicU64::new(0)).collect();
        let suppressed = (0..registry.count()).map(|_| AtomicU64::new(0)).collect();
        debug!(
            categories = registry.count(),
            full_recording = config.record_full_profiler_data,
            "profile session created"
        );
        Self {
            registry,
            filter,
            slowest,
            full_recording: AtomicBool::new(config.record_full_profiler_data),
            emitted,
            suppressed,
        }
    }

    /// Run one completed event through the pipeline.
    ///
    /// Admission decides whether the event is recorded standalone or folded
    /// into aggregate counts. Independently of that decision, events of
    /// categories that track slow instances are offered for retention.
    /// Infallible: classification is fixed by the event's type and retention
    /// routing is guarded here.
    pub fn record(&self, event: &TimedEvent) -> RecordOutcome {
        let index = event.category.index();
        let full_recording = self.full_recording.load(Ordering::Relaxed);
        let emitted = self
            .filter
            .should_emit_standalone(event.category, event.duration_nanos, full_recording);
        if emitted {
            self.emitted[index].fetch_add(1, Ordering::Relaxed);
        } else {
            self.suppressed[index].fetch_add(1, Ordering::Relaxed);
        }
        let mut retained = false;
        if self.slowest.tracks(event.category) {
            // The guard above makes a misroute impossible.
            retained = self.slowest.offer(event).unwrap_or(false);
            if retained {
                debug!(
                    category = ?event.category,
                    duration_nanos = event.duration_nanos,
                    description = %event.description,
                    "retained slow event"
                );
            }
        }
        RecordOutcome { emitted, retained }
    }

    /// Validate raw clock arithmetic, then record.
    ///
    /// This is the entry point for instrumentation layers that hand over
    /// signed times. Negative values are rejected with
    /// [`crate::error::ProfileError::MalformedEvent`] and logged, since they
    /// mean an instrumentation point subtracted timestamps in the wrong
    /// order.
    pub fn record_raw(
        &self,
        category: CategoryId,
        start_nanos: i64,
        duration_nanos: i64,
        description: impl Into<String>,
    ) -> Result<RecordOutcome> {
        let event = match TimedEvent::from_raw(category, start_nanos, duration_nanos, description)
        {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    ?category,
                    start_nanos, duration_nanos, "rejected malformed event"
                );
                return Err(err);
            }
        };
        Ok(self.record(&event))
    }

    /// Ranked slowest instances for one category.
    pub fn slowest(&self, category: CategoryId) -> Vec<SlowEventRecord> {
        self.slowest.snapshot(category)
    }

    /// Point-in-time summary of every category plus the merged slow ranking.
    pub fn summary(&self) -> SessionSummary {
        let categories = self
            .registry
            .categories()
            .map(|category| {
                let index = category.id.index();
                CategorySnapshot {
                    category: category.id,
                    description: category.description,
                    emitted: self.emitted[index].load(Ordering::Relaxed),
                    suppressed: self.suppressed[index].load(Ordering::Relaxed),
                    slowest: self.slowest.snapshot(category.id),
                }
            })
            .collect();
        SessionSummary {
            categories,
            slowest_overall: self.slowest.snapshot_all(),
        }
    }

    /// Start a profiled run with a clean slate.
    pub fn begin_session(&self) {
        self.reset();
        debug!(
            full_recording = self.is_full_recording(),
            "profiling session started"
        );
    }

    /// Finish a profiled run: take the final summary, then discard all
    /// session state.
    pub fn end_session(&self) -> SessionSummary {
        let summary = self.summary();
        self.reset();
        debug!(
            emitted = summary.total_emitted(),
            suppressed = summary.total_suppressed(),
            "profiling session ended"
        );
        summary
    }

    /// Mark a session boundary: drop retained slow events and zero counters.
    ///
    /// Recording threads are expected to be quiet across the boundary.
    pub fn reset(&self) {
        self.slowest.reset_all();
        for counter in &self.emitted {
            counter.store(0, Ordering::Relaxed);
        }
        for counter in &self.suppressed {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// The registry this session classifies against.
    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    /// Toggle the session-wide bypass of admission thresholds.
    pub fn set_full_recording(&self, enabled: bool) {
        self.full_recording.store(enabled, Ordering::Relaxed);
    }

    /// Whether admission thresholds are currently bypassed.
    pub fn is_full_recording(&self) -> bool {
        self.full_recording.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MILLI: u64 = 1_000_000;

    fn session() -> ProfileSession {
        ProfileSession::new(SessionConfig::default())
    }

    #[test]
    fn test_below_threshold_is_suppressed() {
        let session = session();
        let fast_stat = TimedEvent::new(CategoryId::VfsStat, 0, 5 * MILLI, "/etc/hosts");
        assert!(!session.record(&fast_stat).emitted);
        let snapshot = session.summary();
        assert_eq!(snapshot.category(CategoryId::VfsStat).suppressed, 1);
        assert_eq!(snapshot.category(CategoryId::VfsStat).emitted, 0);
    }

    #[test]
    fn test_threshold_free_untracked_category_is_emitted() {
        let session = session();
        let phase = TimedEvent::new(CategoryId::Phase, 0, 1, "analysis");
        assert_eq!(
            session.record(&phase),
            RecordOutcome {
                emitted: true,
                retained: false,
            }
        );
        assert_eq!(session.summary().category(CategoryId::Phase).emitted, 1);
    }

    #[test]
    fn test_admitted_tracked_event_is_retained() {
        let session = session();
        let slow_read = TimedEvent::new(CategoryId::VfsRead, 0, 20 * MILLI, "/src/lib.rs");
        assert_eq!(
            session.record(&slow_read),
            RecordOutcome {
                emitted: true,
                retained: true,
            }
        );
        let slowest = session.slowest(CategoryId::VfsRead);
        assert_eq!(slowest.len(), 1);
        assert_eq!(slowest[0].description, "/src/lib.rs");
        assert_eq!(slowest[0].rank, 1);
    }

    #[test]
    fn test_folded_event_still_competes_for_retention() {
        let session = session();
        // Below the 10ms threshold, so it folds into aggregates, but the
        // tracker has room, so it is retained all the same.
        let fast_read = TimedEvent::new(CategoryId::VfsRead, 0, MILLI, "/warm");
        assert_eq!(
            session.record(&fast_read),
            RecordOutcome {
                emitted: false,
                retained: true,
            }
        );
        assert_eq!(session.slowest(CategoryId::VfsRead).len(), 1);
        assert_eq!(session.summary().category(CategoryId::VfsRead).suppressed, 1);
    }

    #[test]
    fn test_folded_event_cannot_displace_slower_entries() {
        let session = session();
        for i in 0..30u64 {
            session.record(&TimedEvent::new(CategoryId::VfsRead, i, 100 * MILLI, "/slow"));
        }
        let fast = TimedEvent::new(CategoryId::VfsRead, 100, MILLI, "/fast");
        assert_eq!(
            session.record(&fast),
            RecordOutcome {
                emitted: false,
                retained: false,
            }
        );
        assert_eq!(session.slowest(CategoryId::VfsRead).len(), 30);
    }

    #[test]
    fn test_admitted_but_not_slow_enough_to_displace() {
        let session = session();
        for i in 0..30u64 {
            let slow = TimedEvent::new(CategoryId::VfsRead, i, 100 * MILLI, "/big");
            assert!(session.record(&slow).retained);
        }
        let marginal = TimedEvent::new(CategoryId::VfsRead, 100, 10 * MILLI, "/marginal");
        assert_eq!(
            session.record(&marginal),
            RecordOutcome {
                emitted: true,
                retained: false,
            }
        );
        assert_eq!(session.slowest(CategoryId::VfsRead).len(), 30);
        assert_eq!(session.summary().category(CategoryId::VfsRead).emitted, 31);
    }

    #[test]
    fn test_admitted_untracked_category_is_emitted_only() {
        let session = session();
        let upload = TimedEvent::new(CategoryId::UploadTime, 0, 60 * MILLI, "blob");
        assert_eq!(
            session.record(&upload),
            RecordOutcome {
                emitted: true,
                retained: false,
            }
        );
        assert!(session.slowest(CategoryId::UploadTime).is_empty());
    }

    #[test]
    fn test_threshold_boundary_per_category() {
        // Remote VFS stat: 10ms threshold, no slow retention.
        let session = session();
        let emitted: Vec<bool> = [10 * MILLI - 1, 10 * MILLI, 10 * MILLI + 1]
            .iter()
            .enumerate()
            .map(|(i, &duration)| {
                session
                    .record(&TimedEvent::new(
                        CategoryId::VfsRemoteStat,
                        i as u64,
                        duration,
                        "/remote",
                    ))
                    .emitted
            })
            .collect();
        assert_eq!(emitted, vec![false, true, true]);
    }

    #[test]
    fn test_full_recording_bypasses_thresholds() {
        let session = ProfileSession::new(SessionConfig {
            record_full_profiler_data: true,
        });
        assert!(session.is_full_recording());
        let tiny_stat = TimedEvent::new(CategoryId::VfsStat, 0, 1, "/tiny");
        assert_eq!(
            session.record(&tiny_stat),
            RecordOutcome {
                emitted: true,
                retained: true,
            }
        );
    }

    #[test]
    fn test_full_recording_is_toggleable() {
        let session = session();
        let tiny = TimedEvent::new(CategoryId::VfsStat, 0, 1, "/tiny");
        assert!(!session.record(&tiny).emitted);
        session.set_full_recording(true);
        assert!(session.record(&tiny).emitted);
        session.set_full_recording(false);
        assert!(!session.record(&tiny).emitted);
    }

    #[test]
    fn test_end_session_reports_then_clears() {
        let session = session();
        session.begin_session();
        session.record(&TimedEvent::new(CategoryId::VfsRead, 0, 20 * MILLI, "/a"));
        session.record(&TimedEvent::new(CategoryId::VfsStat, 1, 1, "/fast"));

        let report = session.end_session();
        assert_eq!(report.total_emitted(), 1);
        assert_eq!(report.total_suppressed(), 1);
        assert_eq!(report.category(CategoryId::VfsRead).slowest.len(), 1);

        // The run's state is gone once the report is taken.
        let after = session.summary();
        assert_eq!(after.total_emitted(), 0);
        assert!(after.slowest_overall.is_empty());
    }

    #[test]
    fn test_record_raw_rejects_negative_times() {
        let session = session();
        let err = session
            .record_raw(CategoryId::VfsRead, -5, 100, "/bad")
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ProfileError::MalformedEvent { .. }
        ));
        // Nothing was counted or retained for the rejected event.
        assert_eq!(session.summary().total_emitted(), 0);
        assert_eq!(session.summary().total_suppressed(), 0);
        assert!(session.slowest(CategoryId::VfsRead).is_empty());
    }

    #[test]
    fn test_record_raw_accepts_valid_times() {
        let session = session();
        let outcome = session
            .record_raw(CategoryId::LocalParse, 0, 90 * MILLI as i64, "pkg/BUILD")
            .unwrap();
        assert_eq!(
            outcome,
            RecordOutcome {
                emitted: true,
                retained: true,
            }
        );
    }

    #[test]
    fn test_summary_covers_every_category_in_order() {
        let summary = session().summary();
        assert_eq!(summary.categories.len(), CategoryId::COUNT);
        for (index, snapshot) in summary.categories.iter().enumerate() {
            assert_eq!(snapshot.category.index(), index);
        }
    }

    #[test]
    fn test_summary_merges_slowest_across_categories() {
        let session = session();
        session.record(&TimedEvent::new(CategoryId::VfsRead, 0, 20 * MILLI, "/a"));
        session.record(&TimedEvent::new(
            CategoryId::LocalParse,
            1,
            80 * MILLI,
            "pkg/BUILD",
        ));
        session.record(&TimedEvent::new(CategoryId::VfsWrite, 2, 40 * MILLI, "/out"));
        let summary = session.summary();
        let categories: Vec<CategoryId> = summary
            .slowest_overall
            .iter()
            .map(|r| r.category)
            .collect();
        assert_eq!(
            categories,
            vec![CategoryId::LocalParse, CategoryId::VfsWrite, CategoryId::VfsRead]
        );
        assert_eq!(summary.slowest_overall[0].rank, 1);
    }

    #[test]
    fn test_reset_marks_a_session_boundary() {
        let session = session();
        session.record(&TimedEvent::new(CategoryId::VfsRead, 0, 20 * MILLI, "/a"));
        session.record(&TimedEvent::new(CategoryId::VfsStat, 1, 1, "/fast"));
        session.reset();
        let summary = session.summary();
        assert_eq!(summary.total_emitted(), 0);
        assert_eq!(summary.total_suppressed(), 0);
        assert!(summary.slowest_overall.is_empty());
        // The session keeps working after the boundary.
        session.record(&TimedEvent::new(CategoryId::VfsRead, 2, 30 * MILLI, "/b"));
        assert_eq!(session.slowest(CategoryId::VfsRead).len(), 1);
    }

    #[test]
    fn test_concurrent_recording_loses_no_counts() {
        let session = Arc::new(session());
        let per_worker = 1_000u64;
        std::thread::scope(|scope| {
            for worker in 0..4u64 {
                let session = Arc::clone(&session);
                scope.spawn(move || {
                    for i in 0..per_worker {
                        // Alternate between suppressed and admitted durations.
                        let duration = if i % 2 == 0 { 1 } else { 20 * MILLI };
                        let event = TimedEvent::new(
                            CategoryId::VfsDigest,
                            worker * per_worker + i,
                            duration,
                            "/hashed",
                        );
                        session.record(&event);
                    }
                });
            }
        });
        let snapshot = session.summary();
        let digest = snapshot.category(CategoryId::VfsDigest);
        assert_eq!(digest.emitted + digest.suppressed, 4 * per_worker);
        assert_eq!(digest.emitted, 4 * per_worker / 2);
        assert_eq!(digest.slowest.len(), 30);
    }

    #[test]
    fn test_shared_registry_handle() {
        let registry = Arc::new(CategoryRegistry::builtin());
        let first = ProfileSession::with_registry(Arc::clone(&registry), SessionConfig::default());
        let second = ProfileSession::with_registry(Arc::clone(&registry), SessionConfig::default());
        first.record(&TimedEvent::new(CategoryId::VfsRead, 0, 20 * MILLI, "/a"));
        // Sessions are isolated even when they share category metadata.
        assert!(second.slowest(CategoryId::VfsRead).is_empty());
        assert_eq!(first.registry().count(), second.registry().count());
    }
}
