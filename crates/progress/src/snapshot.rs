//! Read-only progress snapshots.

use replay_core::Domain;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Point-in-time copy of one counter and its derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Units observed
    pub count: u64,

    /// Units begun
    pub started: u64,

    /// Units finished
    pub completed: u64,

    /// Names currently in flight
    pub active: BTreeSet<String>,

    /// Percent complete
    pub percent: u8,

    /// Units begun but not finished
    pub in_flight: u64,

    /// Observed units remain unfinished
    pub has_next: bool,

    /// Anything has finished
    pub has_previous: bool,

    /// Human-readable summary
    pub description: String,
}

/// A snapshot of all four domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Generic events
    pub events: CounterSnapshot,

    /// Tasks
    pub tasks: CounterSnapshot,

    /// Stages
    pub stages: CounterSnapshot,

    /// Jobs
    pub jobs: CounterSnapshot,
}

impl ProgressSnapshot {
    /// Snapshot of one domain.
    pub fn get(&self, domain: Domain) -> &CounterSnapshot {
        match domain {
            Domain::Event => &self.events,
            Domain::Task => &self.tasks,
            Domain::Stage => &self.stages,
            Domain::Job => &self.jobs,
        }
    }
}
