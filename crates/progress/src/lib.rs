//! Progress Tracking
//!
//! Event, task, stage, and job progress accumulated from lifecycle
//! notifications, with undo support for replaying backwards.

#![warn(missing_docs)]

pub mod config;
pub mod counter;
pub mod error;
pub mod snapshot;
pub mod tracker;

pub use config::{CountBound, TrackerConfig};
pub use counter::ProgressCounter;
pub use error::{CounterField, CounterViolation, ProgressError, Result};
pub use snapshot::{CounterSnapshot, ProgressSnapshot};
pub use tracker::ProgressTracker;
