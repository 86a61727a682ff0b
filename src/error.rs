//! Error types for the profiling core
//!
//! All failures here are caller precondition violations. The category space is
//! a closed enum, so the classic "unknown category" defect cannot be
//! represented at all; what remains is malformed clock readings at the inbound
//! boundary and events misrouted to categories that retain no slow instances.

use crate::category::CategoryId;
use thiserror::Error;

/// Errors surfaced by the profiling core
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// A raw event carried a negative start time or duration. Negative
    /// readings would corrupt both threshold comparisons and slowest-instance
    /// ranking, so they are rejected instead of coerced.
    #[error(
        "malformed event for {category:?}: start {start_nanos}ns, duration {duration_nanos}ns"
    )]
    MalformedEvent {
        category: CategoryId,
        start_nanos: i64,
        duration_nanos: i64,
    },

    /// An event was offered to a category with a slow-retention capacity of
    /// zero. The coordinator must not route events to untracked categories.
    #[error("event misrouted to {category:?}, which retains no slow instances")]
    MisroutedEvent { category: CategoryId },
}

pub type Result<T> = std::result::Result<T, ProfileError>;
