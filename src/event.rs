//! Timed event records
//!
//! A [`TimedEvent`] is the unit of work the profiling core classifies and
//! filters: one completed task with its category, start time, duration, and a
//! short description of the object it touched (a path for VFS operations, a
//! target label for actions). Times are nanoseconds relative to the session
//! clock origin.
//!
//! Inside the crate both time fields are unsigned. Instrumentation layers
//! that compute them from raw clock arithmetic go through [`TimedEvent::from_raw`],
//! which rejects negative values instead of letting them wrap.

use crate::category::CategoryId;
use crate::error::{ProfileError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One completed, classified unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Category this event was classified into.
    pub category: CategoryId,
    /// Start time in nanoseconds since the session clock origin.
    pub start_nanos: u64,
    /// Elapsed wall time in nanoseconds.
    pub duration_nanos: u64,
    /// What the event operated on, e.g. a file path or target label.
    pub description: String,
}

impl TimedEvent {
    /// Create an event from already-validated times.
    pub fn new(
        category: CategoryId,
        start_nanos: u64,
        duration_nanos: u64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category,
            start_nanos,
            duration_nanos,
            description: description.into(),
        }
    }

    /// Create an event from raw signed clock arithmetic.
    ///
    /// Returns [`ProfileError::MalformedEvent`] if either time is negative,
    /// which happens when an instrumentation point subtracts timestamps in
    /// the wrong order.
    pub fn from_raw(
        category: CategoryId,
        start_nanos: i64,
        duration_nanos: i64,
        description: impl Into<String>,
    ) -> Result<Self> {
        if start_nanos < 0 || duration_nanos < 0 {
            return Err(ProfileError::MalformedEvent {
                category,
                start_nanos,
                duration_nanos,
            });
        }
        Ok(Self::new(
            category,
            start_nanos as u64,
            duration_nanos as u64,
            description,
        ))
    }

    /// Elapsed time as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.duration_nanos)
    }

    /// End time in nanoseconds since the session clock origin.
    pub fn end_nanos(&self) -> u64 {
        self.start_nanos.saturating_add(self.duration_nanos)
    }
}
