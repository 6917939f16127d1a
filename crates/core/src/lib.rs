//! Replay core data models.
//!
//! This crate defines the identifiers and typed lifecycle notifications that
//! a decoder hands to the progress tracker.

#![warn(missing_docs)]

// Identities
mod id;

// Lifecycle notifications
mod notification;

// Re-exports
pub use id::*;

pub use notification::{Direction, Domain, JobInfo, Notification, StageInfo, TaskInfo};
