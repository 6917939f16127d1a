//! Tracker configuration.

use serde::{Deserialize, Serialize};

/// Whether `begin` may run ahead of `record_unit`.
///
/// Units are counted when they end, so `started` normally exceeds `count`
/// while units are in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountBound {
    /// `begin` does not check `count`
    #[default]
    Lenient,
    /// `begin` is rejected if it would make `started > count`
    Strict,
}

/// Configuration for the progress tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Count bound applied to all four counters
    pub count_bound: CountBound,
    /// Max entries in the job name table (None = unbounded)
    pub job_name_capacity: Option<usize>,
    /// Description used for jobs started without one
    pub unknown_job_label: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            count_bound: CountBound::Lenient,
            job_name_capacity: None,
            unknown_job_label: "Unknown".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Set the count bound.
    pub fn with_count_bound(mut self, count_bound: CountBound) -> Self {
        self.count_bound = count_bound;
        self
    }

    /// Cap the job name table.
    pub fn with_job_name_capacity(mut self, capacity: usize) -> Self {
        self.job_name_capacity = Some(capacity);
        self
    }

    /// Set the label for jobs without a description.
    pub fn with_unknown_job_label(mut self, label: impl Into<String>) -> Self {
        self.unknown_job_label = label.into();
        self
    }
}
