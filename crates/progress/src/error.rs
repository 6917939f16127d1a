//! Error types for progress tracking.

use replay_core::{Domain, JobId};

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Counter field named in a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    /// Units observed
    Count,
    /// Units begun
    Started,
    /// Units finished
    Completed,
}

impl CounterField {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterField::Count => "count",
            CounterField::Started => "started",
            CounterField::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CounterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A counter mutation or seed that would break `completed <= started <= count`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterViolation {
    /// An undo would drive a field below zero
    #[error("unbalanced undo: {field} is already 0")]
    UnbalancedUndo {
        /// Field that would go negative
        field: CounterField,
    },

    /// More completions than starts
    #[error("completed ({completed}) would exceed started ({started})")]
    CompletedExceedsStarted {
        /// Resulting completed value
        completed: u64,
        /// Resulting started value
        started: u64,
    },

    /// More starts than observed units
    #[error("started ({started}) would exceed count ({count})")]
    StartedExceedsCount {
        /// Resulting started value
        started: u64,
        /// Current count
        count: u64,
    },

    /// Negative seed value
    #[error("{field} must be non-negative, got {value}")]
    Negative {
        /// Offending field
        field: CounterField,
        /// Value supplied
        value: i64,
    },

    /// Seed without an active set
    #[error("active set is missing")]
    MissingActiveSet,
}

/// Errors that can occur while applying lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    /// A counter rejected the mutation
    #[error("{domain} progress: {source}")]
    Counter {
        /// Domain of the counter
        domain: Domain,
        /// What was violated
        #[source]
        source: CounterViolation,
    },

    /// Job end (or its undo) for a job never seen starting
    #[error("inconsistent event order: job {0} ended without a matching start")]
    UnresolvedJob(JobId),

    /// The configured job name capacity is exhausted
    #[error("job name table is full ({capacity} entries)")]
    JobTableFull {
        /// Configured capacity
        capacity: usize,
    },

    /// A counter seed was rejected at construction time
    #[error("invalid {domain} progress seed: {source}")]
    InvalidSeed {
        /// Domain of the counter
        domain: Domain,
        /// What was violated
        #[source]
        source: CounterViolation,
    },
}

impl ProgressError {
    /// Domain the error concerns.
    pub fn domain(&self) -> Domain {
        match self {
            ProgressError::Counter { domain, .. } | ProgressError::InvalidSeed { domain, .. } => {
                *domain
            }
            ProgressError::UnresolvedJob(_) | ProgressError::JobTableFull { .. } => Domain::Job,
        }
    }
}
