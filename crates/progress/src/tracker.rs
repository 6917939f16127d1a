//! Progress tracking service.

use crate::config::TrackerConfig;
use crate::counter::ProgressCounter;
use crate::error::{CounterViolation, ProgressError, Result};
use crate::snapshot::ProgressSnapshot;
use replay_core::{Direction, Domain, JobId, JobInfo, Notification, StageInfo, TaskInfo};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Accumulates lifecycle notifications into event, task, stage, and job
/// progress.
///
/// Each forward notification has a named inverse computed from the same
/// payload. Job names are registered on start and looked up on end, since
/// job-end notifications carry only the job id:
/// ```text
/// job_start(7, "ETL") → active {"ID7:ETL"}, names {7 → "ID7:ETL"}
/// job_end(7)          → active {},          names {7 → "ID7:ETL"}
/// ```
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    events: ProgressCounter,
    tasks: ProgressCounter,
    stages: ProgressCounter,
    jobs: ProgressCounter,
    job_names: HashMap<JobId, String>,
    config: TrackerConfig,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            events: ProgressCounter::new(),
            tasks: ProgressCounter::new(),
            stages: ProgressCounter::new(),
            jobs: ProgressCounter::new(),
            job_names: HashMap::new(),
            config: TrackerConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        for domain in Domain::ALL {
            let counter = std::mem::take(self.counter_mut(domain));
            *self.counter_mut(domain) = counter.with_bound(config.count_bound);
        }
        self.config = config;
        self
    }

    /// Seed one domain's counter, e.g. when resuming from a known position.
    pub fn seeded(
        mut self,
        domain: Domain,
        count: u64,
        started: u64,
        completed: u64,
        active: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        let bound = self.config.count_bound;
        let counter = ProgressCounter::from_parts(count, started, completed, active, bound)
            .map_err(|source| ProgressError::InvalidSeed { domain, source })?;
        *self.counter_mut(domain) = counter;
        Ok(self)
    }

    /// Current configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Event progress.
    pub fn events(&self) -> &ProgressCounter {
        &self.events
    }

    /// Task progress.
    pub fn tasks(&self) -> &ProgressCounter {
        &self.tasks
    }

    /// Stage progress.
    pub fn stages(&self) -> &ProgressCounter {
        &self.stages
    }

    /// Job progress.
    pub fn jobs(&self) -> &ProgressCounter {
        &self.jobs
    }

    /// Progress of one domain.
    pub fn counter(&self, domain: Domain) -> &ProgressCounter {
        match domain {
            Domain::Event => &self.events,
            Domain::Task => &self.tasks,
            Domain::Stage => &self.stages,
            Domain::Job => &self.jobs,
        }
    }

    /// Name registered for a job when it started.
    pub fn job_name(&self, job_id: JobId) -> Option<&str> {
        self.job_names.get(&job_id).map(String::as_str)
    }

    /// Take a progress snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            events: self.events.snapshot(),
            tasks: self.tasks.snapshot(),
            stages: self.stages.snapshot(),
            jobs: self.jobs.snapshot(),
        }
    }

    /// Apply a typed notification.
    pub fn apply(&mut self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::Observed { domain } => {
                self.observe(*domain);
                Ok(())
            }
            Notification::EventToggle { direction } => self.event_toggle(*direction),
            Notification::TaskStart { task, direction } => match direction {
                Direction::Forward => self.task_start(task),
                Direction::Undo => self.undo_task_start(task),
            },
            Notification::TaskEnd { task, direction } => match direction {
                Direction::Forward => self.task_end(task),
                Direction::Undo => self.undo_task_end(task),
            },
            Notification::StageSubmitted { stage, direction } => match direction {
                Direction::Forward => self.stage_submitted(stage),
                Direction::Undo => self.undo_stage_submitted(stage),
            },
            Notification::StageCompleted { stage, direction } => match direction {
                Direction::Forward => self.stage_completed(stage),
                Direction::Undo => self.undo_stage_completed(stage),
            },
            Notification::JobStart { job, direction } => match direction {
                Direction::Forward => self.job_start(job),
                Direction::Undo => self.undo_job_start(job),
            },
            Notification::JobEnd { job_id, direction } => match direction {
                Direction::Forward => self.job_end(*job_id),
                Direction::Undo => self.undo_job_end(*job_id),
            },
        }
    }

    // === Observation ===

    /// Record an observed unit of the given domain.
    pub fn observe(&mut self, domain: Domain) {
        self.counter_mut(domain).record_unit();
        debug!("Observed {} (count {})", domain, self.counter(domain).count());
    }

    /// Record any observed event.
    pub fn observe_event(&mut self) {
        self.observe(Domain::Event);
    }

    /// Record an ended task.
    pub fn observe_task(&mut self) {
        self.observe(Domain::Task);
    }

    /// Record a completed stage.
    pub fn observe_stage(&mut self) {
        self.observe(Domain::Stage);
    }

    /// Record an ended job.
    pub fn observe_job(&mut self) {
        self.observe(Domain::Job);
    }

    /// Coarse on/off framing on the event counter.
    pub fn event_toggle(&mut self, direction: Direction) -> Result<()> {
        match direction {
            Direction::Forward => {
                self.mutate(Domain::Event, "event_on", None, |c, _| c.toggle_on())
            }
            Direction::Undo => {
                self.mutate(Domain::Event, "event_off", None, |c, _| c.toggle_off())
            }
        }
    }

    // === Tasks ===

    /// A task started.
    pub fn task_start(&mut self, task: &TaskInfo) -> Result<()> {
        let name = task.display_name();
        self.mutate(Domain::Task, "task_start", Some(&name), ProgressCounter::begin)
    }

    /// Reverse [`task_start`](Self::task_start).
    pub fn undo_task_start(&mut self, task: &TaskInfo) -> Result<()> {
        let name = task.display_name();
        self.mutate(Domain::Task, "undo_task_start", Some(&name), ProgressCounter::undo_begin)
    }

    /// A task ended.
    pub fn task_end(&mut self, task: &TaskInfo) -> Result<()> {
        let name = task.display_name();
        self.mutate(Domain::Task, "task_end", Some(&name), ProgressCounter::finish)
    }

    /// Reverse [`task_end`](Self::task_end).
    pub fn undo_task_end(&mut self, task: &TaskInfo) -> Result<()> {
        let name = task.display_name();
        self.mutate(Domain::Task, "undo_task_end", Some(&name), ProgressCounter::undo_finish)
    }

    // === Stages ===

    /// A stage was submitted.
    pub fn stage_submitted(&mut self, stage: &StageInfo) -> Result<()> {
        self.mutate(
            Domain::Stage,
            "stage_submitted",
            Some(stage.display_name()),
            ProgressCounter::begin,
        )
    }

    /// Reverse [`stage_submitted`](Self::stage_submitted).
    pub fn undo_stage_submitted(&mut self, stage: &StageInfo) -> Result<()> {
        self.mutate(
            Domain::Stage,
            "undo_stage_submitted",
            Some(stage.display_name()),
            ProgressCounter::undo_begin,
        )
    }

    /// A stage completed.
    pub fn stage_completed(&mut self, stage: &StageInfo) -> Result<()> {
        self.mutate(
            Domain::Stage,
            "stage_completed",
            Some(stage.display_name()),
            ProgressCounter::finish,
        )
    }

    /// Reverse [`stage_completed`](Self::stage_completed).
    pub fn undo_stage_completed(&mut self, stage: &StageInfo) -> Result<()> {
        self.mutate(
            Domain::Stage,
            "undo_stage_completed",
            Some(stage.display_name()),
            ProgressCounter::undo_finish,
        )
    }

    // === Jobs ===

    /// A job started. The name is registered on the first start of the id.
    pub fn job_start(&mut self, job: &JobInfo) -> Result<()> {
        let name = match self.job_names.get(&job.job_id) {
            Some(name) => name.clone(),
            None => {
                if let Some(capacity) = self.config.job_name_capacity {
                    if self.job_names.len() >= capacity {
                        warn!("Job {} not tracked: name table full ({})", job.job_id, capacity);
                        return Err(ProgressError::JobTableFull { capacity });
                    }
                }
                job.display_name(&self.config.unknown_job_label)
            }
        };

        self.mutate(Domain::Job, "job_start", Some(&name), ProgressCounter::begin)?;
        self.job_names.entry(job.job_id).or_insert(name);
        Ok(())
    }

    /// Reverse [`job_start`](Self::job_start). The registered name is kept.
    pub fn undo_job_start(&mut self, job: &JobInfo) -> Result<()> {
        let name = self
            .job_names
            .get(&job.job_id)
            .cloned()
            .unwrap_or_else(|| job.display_name(&self.config.unknown_job_label));
        self.mutate(Domain::Job, "undo_job_start", Some(&name), ProgressCounter::undo_begin)
    }

    /// A job ended.
    pub fn job_end(&mut self, job_id: JobId) -> Result<()> {
        let name = self.resolve_job(job_id)?;
        self.mutate(Domain::Job, "job_end", Some(&name), ProgressCounter::finish)
    }

    /// Reverse [`job_end`](Self::job_end).
    pub fn undo_job_end(&mut self, job_id: JobId) -> Result<()> {
        let name = self.resolve_job(job_id)?;
        self.mutate(Domain::Job, "undo_job_end", Some(&name), ProgressCounter::undo_finish)
    }

    fn resolve_job(&self, job_id: JobId) -> Result<String> {
        match self.job_names.get(&job_id) {
            Some(name) => Ok(name.clone()),
            None => {
                warn!("Job {} ended without a matching start", job_id);
                Err(ProgressError::UnresolvedJob(job_id))
            }
        }
    }

    fn counter_mut(&mut self, domain: Domain) -> &mut ProgressCounter {
        match domain {
            Domain::Event => &mut self.events,
            Domain::Task => &mut self.tasks,
            Domain::Stage => &mut self.stages,
            Domain::Job => &mut self.jobs,
        }
    }

    fn mutate<F>(
        &mut self,
        domain: Domain,
        operation: &'static str,
        name: Option<&str>,
        f: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut ProgressCounter, Option<&str>) -> std::result::Result<(), CounterViolation>,
    {
        let counter = self.counter_mut(domain);
        match f(counter, name) {
            Ok(()) => {
                debug!("{} {}: {}", operation, name.unwrap_or("-"), counter);
                Ok(())
            }
            Err(source) => {
                warn!("Rejected {} {}: {}", operation, name.unwrap_or("-"), source);
                Err(ProgressError::Counter { domain, source })
            }
        }
    }
}
