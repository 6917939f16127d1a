//! Notification model - typed lifecycle notifications handed over by a decoder.

use crate::id::{JobId, StageId, TaskId};
use serde::{Deserialize, Serialize};

/// The four nested progress domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Generic events
    Event,
    /// Tasks
    Task,
    /// Stages
    Stage,
    /// Jobs
    Job,
}

impl Domain {
    /// All domains, outermost last.
    pub const ALL: [Domain; 4] = [Domain::Event, Domain::Task, Domain::Stage, Domain::Job];

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Event => "event",
            Domain::Task => "task",
            Domain::Stage => "stage",
            Domain::Job => "job",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Whether a notification applies a transition or reverses one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Apply the transition
    #[default]
    Forward,
    /// Reverse a previously applied transition of the same kind
    Undo,
}

impl Direction {
    /// True for [`Direction::Undo`].
    pub fn is_undo(&self) -> bool {
        matches!(self, Direction::Undo)
    }
}

/// Payload of task start and task end notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Task identifier
    pub task_id: TaskId,

    /// Placement locality (e.g. `NODE_LOCAL`)
    pub locality: String,

    /// Host the task ran on
    pub host: String,

    /// Attempt number, starting at 0
    pub attempt: u32,
}

impl TaskInfo {
    /// Create task info.
    pub fn new(
        task_id: impl Into<TaskId>,
        locality: impl Into<String>,
        host: impl Into<String>,
        attempt: u32,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            locality: locality.into(),
            host: host.into(),
            attempt,
        }
    }

    /// Name under which the task appears in the active set.
    ///
    /// Identical at start and end, so no lookup table is needed.
    pub fn display_name(&self) -> String {
        format!(
            "ID{}:{}:{}(attempt {})",
            self.task_id, self.locality, self.host, self.attempt
        )
    }
}

/// Payload of stage submitted and stage completed notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInfo {
    /// Stage identifier
    pub stage_id: StageId,

    /// Stage display name
    pub name: String,
}

impl StageInfo {
    /// Create stage info.
    pub fn new(stage_id: impl Into<StageId>, name: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            name: name.into(),
        }
    }

    /// Name under which the stage appears in the active set.
    pub fn display_name(&self) -> &str {
        &self.name
    }
}

/// Payload of job start notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Job identifier
    pub job_id: JobId,

    /// Descriptive property of the job, if the source recorded one
    #[serde(default)]
    pub description: Option<String>,
}

impl JobInfo {
    /// Create job info with a description.
    pub fn new(job_id: impl Into<JobId>, description: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            description: Some(description.into()),
        }
    }

    /// Create job info without a description.
    pub fn unnamed(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            description: None,
        }
    }

    /// Name derived from the id and description, using `unknown` when the
    /// description is absent.
    pub fn display_name(&self, unknown: &str) -> String {
        let description = self.description.as_deref().unwrap_or(unknown);
        format!("ID{}:{}", self.job_id, description)
    }
}

/// A single lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A unit of the given domain was observed (counts toward the total).
    Observed {
        /// Domain the unit belongs to
        domain: Domain,
    },

    /// Coarse on/off framing on the event domain.
    EventToggle {
        /// Forward or undo
        #[serde(default)]
        direction: Direction,
    },

    /// A task started.
    TaskStart {
        /// Task payload
        task: TaskInfo,
        /// Forward or undo
        #[serde(default)]
        direction: Direction,
    },

    /// A task ended.
    TaskEnd {
        /// Task payload
        task: TaskInfo,
        /// Forward or undo
        #[serde(default)]
        direction: Direction,
    },

    /// A stage was submitted.
    StageSubmitted {
        /// Stage payload
        stage: StageInfo,
        /// Forward or undo
        #[serde(default)]
        direction: Direction,
    },

    /// A stage completed.
    StageCompleted {
        /// Stage payload
        stage: StageInfo,
        /// Forward or undo
        #[serde(default)]
        direction: Direction,
    },

    /// A job started.
    JobStart {
        /// Job payload
        job: JobInfo,
        /// Forward or undo
        #[serde(default)]
        direction: Direction,
    },

    /// A job ended. Carries only the identifier.
    JobEnd {
        /// Job identifier
        job_id: JobId,
        /// Forward or undo
        #[serde(default)]
        direction: Direction,
    },
}

impl Notification {
    /// Domain whose counter this notification mutates.
    pub fn domain(&self) -> Domain {
        match self {
            Notification::Observed { domain } => *domain,
            Notification::EventToggle { .. } => Domain::Event,
            Notification::TaskStart { .. } | Notification::TaskEnd { .. } => Domain::Task,
            Notification::StageSubmitted { .. } | Notification::StageCompleted { .. } => {
                Domain::Stage
            }
            Notification::JobStart { .. } | Notification::JobEnd { .. } => Domain::Job,
        }
    }

    /// Direction of the notification. `Observed` is always forward.
    pub fn direction(&self) -> Direction {
        match self {
            Notification::Observed { .. } => Direction::Forward,
            Notification::EventToggle { direction }
            | Notification::TaskStart { direction, .. }
            | Notification::TaskEnd { direction, .. }
            | Notification::StageSubmitted { direction, .. }
            | Notification::StageCompleted { direction, .. }
            | Notification::JobStart { direction, .. }
            | Notification::JobEnd { direction, .. } => *direction,
        }
    }

    /// Short name of the notification kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Observed { .. } => "observed",
            Notification::EventToggle { .. } => "event_toggle",
            Notification::TaskStart { .. } => "task_start",
            Notification::TaskEnd { .. } => "task_end",
            Notification::StageSubmitted { .. } => "stage_submitted",
            Notification::StageCompleted { .. } => "stage_completed",
            Notification::JobStart { .. } => "job_start",
            Notification::JobEnd { .. } => "job_end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_display_name() {
        let task = TaskInfo::new(1, "NODE_LOCAL", "h1", 0);
        assert_eq!(task.display_name(), "ID1:NODE_LOCAL:h1(attempt 0)");
    }

    #[test]
    fn test_job_display_name_falls_back() {
        assert_eq!(JobInfo::new(7, "ETL").display_name("Unknown"), "ID7:ETL");
        assert_eq!(JobInfo::unnamed(8).display_name("Unknown"), "ID8:Unknown");
    }

    #[test]
    fn test_direction_defaults_to_forward() {
        let json = r#"{"kind": "job_end", "job_id": 3}"#;
        let notification: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(
            notification,
            Notification::JobEnd {
                job_id: JobId(3),
                direction: Direction::Forward,
            }
        );
        assert_eq!(notification.domain(), Domain::Job);
    }

    #[test]
    fn test_undo_task_start_from_json() {
        let json = r#"{
            "kind": "task_start",
            "task": {"task_id": 4, "locality": "ANY", "host": "h2", "attempt": 1},
            "direction": "undo"
        }"#;
        let notification: Notification = serde_json::from_str(json).unwrap();
        assert!(notification.direction().is_undo());
        assert_eq!(notification.kind(), "task_start");
        assert_eq!(notification.domain(), Domain::Task);
    }

    #[test]
    fn test_domain_display_honours_width() {
        assert_eq!(format!("{:>6}", Domain::Job), "   job");
        assert_eq!(Domain::Stage.to_string(), "stage");
    }

    #[test]
    fn test_observed_is_always_forward() {
        let json = r#"{"kind": "observed", "domain": "stage"}"#;
        let notification: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.domain(), Domain::Stage);
        assert_eq!(notification.direction(), Direction::Forward);
    }
}
