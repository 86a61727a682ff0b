//! Demora - task classification and slow-event retention for build profiling
//!
//! This library provides the profiling core for instrumented build and
//! analysis engines: a closed registry of task categories, duration-based
//! admission filtering for high-frequency events, and bounded retention of
//! the slowest instances per category, coordinated per profiled session.

pub mod admission;
pub mod category;
pub mod error;
pub mod event;
pub mod session;
pub mod slowest;
