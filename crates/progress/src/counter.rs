//! Progress counter - one domain's running aggregate.

use crate::config::CountBound;
use crate::error::{CounterField, CounterViolation};
use crate::snapshot::CounterSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Running aggregate of one domain: observed, started, completed, and the
/// names currently in flight.
///
/// Every mutation either succeeds or leaves the counter untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CounterSeed")]
pub struct ProgressCounter {
    count: u64,
    started: u64,
    completed: u64,
    active: BTreeSet<String>,
    bound: CountBound,
}

impl Default for ProgressCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self {
            count: 0,
            started: 0,
            completed: 0,
            active: BTreeSet::new(),
            bound: CountBound::Lenient,
        }
    }

    /// Create a counter from seed values.
    ///
    /// `started <= count` is only required under [`CountBound::Strict`].
    pub fn from_parts(
        count: u64,
        started: u64,
        completed: u64,
        active: impl IntoIterator<Item = String>,
        bound: CountBound,
    ) -> Result<Self, CounterViolation> {
        if bound == CountBound::Strict && started > count {
            return Err(CounterViolation::StartedExceedsCount { started, count });
        }
        if completed > started {
            return Err(CounterViolation::CompletedExceedsStarted { completed, started });
        }
        Ok(Self {
            count,
            started,
            completed,
            active: active.into_iter().collect(),
            bound,
        })
    }

    /// Set the count bound.
    pub fn with_bound(mut self, bound: CountBound) -> Self {
        self.bound = bound;
        self
    }

    /// Units observed.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Units begun.
    pub fn started(&self) -> u64 {
        self.started
    }

    /// Units finished.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Names currently in flight.
    pub fn active(&self) -> &BTreeSet<String> {
        &self.active
    }

    /// Count bound in effect.
    pub fn bound(&self) -> CountBound {
        self.bound
    }

    /// Percent complete, 0 when nothing has been observed.
    pub fn percent(&self) -> u8 {
        if self.count == 0 {
            return 0;
        }
        let percent = (self.completed as f64 * 100.0 / self.count as f64).round();
        percent.min(100.0) as u8
    }

    /// Units begun but not finished.
    pub fn in_flight(&self) -> u64 {
        self.started - self.completed
    }

    /// True while observed units remain unfinished.
    pub fn has_next(&self) -> bool {
        self.completed < self.count
    }

    /// True once anything has finished.
    pub fn has_previous(&self) -> bool {
        self.completed > 0
    }

    /// Record an observed unit.
    pub fn record_unit(&mut self) {
        self.count += 1;
    }

    /// Mark a unit as begun.
    pub fn begin(&mut self, name: Option<&str>) -> Result<(), CounterViolation> {
        self.check_started_bound(self.started + 1)?;
        self.started += 1;
        if let Some(name) = name {
            self.active.insert(name.to_owned());
        }
        Ok(())
    }

    /// Mark a unit as finished.
    pub fn finish(&mut self, name: Option<&str>) -> Result<(), CounterViolation> {
        if self.completed + 1 > self.started {
            return Err(CounterViolation::CompletedExceedsStarted {
                completed: self.completed + 1,
                started: self.started,
            });
        }
        self.completed += 1;
        if let Some(name) = name {
            self.active.remove(name);
        }
        Ok(())
    }

    /// Reverse a [`begin`](Self::begin) with the same name.
    pub fn undo_begin(&mut self, name: Option<&str>) -> Result<(), CounterViolation> {
        let started = self
            .started
            .checked_sub(1)
            .ok_or(CounterViolation::UnbalancedUndo {
                field: CounterField::Started,
            })?;
        if self.completed > started {
            return Err(CounterViolation::CompletedExceedsStarted {
                completed: self.completed,
                started,
            });
        }
        self.started = started;
        if let Some(name) = name {
            self.active.remove(name);
        }
        Ok(())
    }

    /// Reverse a [`finish`](Self::finish) with the same name.
    pub fn undo_finish(&mut self, name: Option<&str>) -> Result<(), CounterViolation> {
        self.completed = self
            .completed
            .checked_sub(1)
            .ok_or(CounterViolation::UnbalancedUndo {
                field: CounterField::Completed,
            })?;
        if let Some(name) = name {
            self.active.insert(name.to_owned());
        }
        Ok(())
    }

    /// Begin and finish one unit together.
    pub fn toggle_on(&mut self) -> Result<(), CounterViolation> {
        self.check_started_bound(self.started + 1)?;
        self.started += 1;
        self.completed += 1;
        Ok(())
    }

    /// Reverse a [`toggle_on`](Self::toggle_on).
    pub fn toggle_off(&mut self) -> Result<(), CounterViolation> {
        if self.completed == 0 {
            return Err(CounterViolation::UnbalancedUndo {
                field: CounterField::Completed,
            });
        }
        // completed <= started, so started is non-zero here too
        self.started -= 1;
        self.completed -= 1;
        Ok(())
    }

    /// Human-readable summary.
    pub fn description(&self) -> String {
        let mut description = format!(
            "Completed {} / {} ({}%) with {} active",
            self.completed,
            self.count,
            self.percent(),
            self.in_flight()
        );
        if !self.active.is_empty() {
            let names: Vec<&str> = self.active.iter().map(String::as_str).collect();
            description.push_str(&format!(" ({})", names.join(", ")));
        }
        description
    }

    /// Read-only copy of the counter and its derived metrics.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            count: self.count,
            started: self.started,
            completed: self.completed,
            active: self.active.clone(),
            percent: self.percent(),
            in_flight: self.in_flight(),
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            description: self.description(),
        }
    }

    fn check_started_bound(&self, started: u64) -> Result<(), CounterViolation> {
        if self.bound == CountBound::Strict && started > self.count {
            return Err(CounterViolation::StartedExceedsCount {
                started,
                count: self.count,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for ProgressCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// Untrusted counter values, validated before becoming a [`ProgressCounter`].
#[derive(Debug, Deserialize)]
struct CounterSeed {
    count: i64,
    started: i64,
    completed: i64,
    active: Option<BTreeSet<String>>,
    #[serde(default)]
    bound: CountBound,
}

impl TryFrom<CounterSeed> for ProgressCounter {
    type Error = CounterViolation;

    fn try_from(seed: CounterSeed) -> Result<Self, Self::Error> {
        let count = non_negative(CounterField::Count, seed.count)?;
        let started = non_negative(CounterField::Started, seed.started)?;
        let completed = non_negative(CounterField::Completed, seed.completed)?;
        let active = seed.active.ok_or(CounterViolation::MissingActiveSet)?;
        ProgressCounter::from_parts(count, started, completed, active, seed.bound)
    }
}

fn non_negative(field: CounterField, value: i64) -> Result<u64, CounterViolation> {
    u64::try_from(value).map_err(|_| CounterViolation::Negative { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(counter: &ProgressCounter) -> Vec<&str> {
        counter.active().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_new_counter_is_empty() {
        let counter = ProgressCounter::new();
        assert_eq!(counter.count(), 0);
        assert_eq!(counter.started(), 0);
        assert_eq!(counter.completed(), 0);
        assert!(counter.active().is_empty());
        assert_eq!(counter.percent(), 0);
        assert!(!counter.has_next());
        assert!(!counter.has_previous());
    }

    #[test]
    fn test_begin_and_finish_track_active_names() {
        let mut counter = ProgressCounter::new();
        counter.record_unit();
        counter.record_unit();
        counter.begin(Some("a")).unwrap();
        counter.begin(Some("b")).unwrap();
        assert_eq!(names(&counter), vec!["a", "b"]);
        assert_eq!(counter.in_flight(), 2);

        counter.finish(Some("a")).unwrap();
        assert_eq!(names(&counter), vec!["b"]);
        assert_eq!(counter.percent(), 50);
        assert!(counter.has_next());
        assert!(counter.has_previous());

        counter.finish(Some("b")).unwrap();
        assert!(counter.active().is_empty());
        assert_eq!(counter.percent(), 100);
        assert!(!counter.has_next());
    }

    #[test]
    fn test_unnamed_mutations_leave_active_alone() {
        let mut counter = ProgressCounter::new();
        counter.begin(None).unwrap();
        counter.finish(None).unwrap();
        assert!(counter.active().is_empty());
        assert_eq!(counter.started(), 1);
        assert_eq!(counter.completed(), 1);
    }

    #[test]
    fn test_undo_begin_reverses_begin() {
        let mut counter = ProgressCounter::new();
        counter.record_unit();
        let before = counter.clone();
        counter.begin(Some("x")).unwrap();
        counter.undo_begin(Some("x")).unwrap();
        assert_eq!(counter, before);
    }

    #[test]
    fn test_undo_finish_reverses_finish() {
        let mut counter = ProgressCounter::new();
        counter.begin(Some("x")).unwrap();
        let before = counter.clone();
        counter.finish(Some("x")).unwrap();
        assert!(counter.active().is_empty());
        counter.undo_finish(Some("x")).unwrap();
        assert_eq!(counter, before);
    }

    #[test]
    fn test_undo_begin_on_empty_is_unbalanced() {
        let mut counter = ProgressCounter::new();
        let err = counter.undo_begin(Some("x")).unwrap_err();
        assert_eq!(
            err,
            CounterViolation::UnbalancedUndo {
                field: CounterField::Started
            }
        );
        assert_eq!(counter, ProgressCounter::new());
    }

    #[test]
    fn test_undo_finish_on_empty_is_unbalanced() {
        let mut counter = ProgressCounter::new();
        let err = counter.undo_finish(Some("x")).unwrap_err();
        assert_eq!(
            err,
            CounterViolation::UnbalancedUndo {
                field: CounterField::Completed
            }
        );
        assert!(counter.active().is_empty());
    }

    #[test]
    fn test_undo_begin_below_completed_is_rejected() {
        let mut counter = ProgressCounter::new();
        counter.begin(Some("x")).unwrap();
        counter.finish(Some("x")).unwrap();
        let before = counter.clone();
        let err = counter.undo_begin(Some("x")).unwrap_err();
        assert_eq!(
            err,
            CounterViolation::CompletedExceedsStarted {
                completed: 1,
                started: 0
            }
        );
        assert_eq!(counter, before);
    }

    #[test]
    fn test_finish_without_begin_is_rejected() {
        let mut counter = ProgressCounter::new();
        counter.record_unit();
        let err = counter.finish(Some("x")).unwrap_err();
        assert_eq!(
            err,
            CounterViolation::CompletedExceedsStarted {
                completed: 1,
                started: 0
            }
        );
        assert_eq!(counter.completed(), 0);
    }

    #[test]
    fn test_strict_bound_rejects_begin_ahead_of_count() {
        let mut counter = ProgressCounter::new().with_bound(CountBound::Strict);
        let err = counter.begin(Some("x")).unwrap_err();
        assert_eq!(
            err,
            CounterViolation::StartedExceedsCount {
                started: 1,
                count: 0
            }
        );
        assert!(counter.active().is_empty());

        counter.record_unit();
        counter.begin(Some("x")).unwrap();
        assert_eq!(counter.started(), 1);
    }

    #[test]
    fn test_toggle_moves_started_and_completed_together() {
        let mut counter = ProgressCounter::new();
        counter.toggle_on().unwrap();
        counter.toggle_on().unwrap();
        assert_eq!((counter.started(), counter.completed()), (2, 2));
        counter.toggle_off().unwrap();
        assert_eq!((counter.started(), counter.completed()), (1, 1));
        counter.toggle_off().unwrap();
        assert!(counter.toggle_off().is_err());
        assert_eq!((counter.started(), counter.completed()), (0, 0));
    }

    #[test]
    fn test_percent_is_zero_without_count() {
        let mut counter = ProgressCounter::new();
        counter.begin(None).unwrap();
        counter.finish(None).unwrap();
        assert_eq!(counter.percent(), 0);
    }

    #[test]
    fn test_percent_rounds_and_clamps() {
        let mut counter = ProgressCounter::from_parts(3, 2, 2, Vec::new(), CountBound::Lenient).unwrap();
        assert_eq!(counter.percent(), 67);

        // completed may run ahead of count in lenient mode
        counter.begin(None).unwrap();
        counter.begin(None).unwrap();
        counter.finish(None).unwrap();
        counter.finish(None).unwrap();
        assert_eq!(counter.percent(), 100);
    }

    #[test]
    fn test_description() {
        let mut counter = ProgressCounter::new();
        for _ in 0..4 {
            counter.record_unit();
        }
        counter.begin(Some("stage b")).unwrap();
        counter.begin(Some("stage a")).unwrap();
        counter.begin(None).unwrap();
        counter.finish(None).unwrap();
        assert_eq!(
            counter.description(),
            "Completed 1 / 4 (25%) with 2 active (stage a, stage b)"
        );

        let empty = ProgressCounter::new();
        assert_eq!(empty.to_string(), "Completed 0 / 0 (0%) with 0 active");
    }

    #[test]
    fn test_from_parts_validates_order() {
        assert!(ProgressCounter::from_parts(2, 2, 1, Vec::new(), CountBound::Strict).is_ok());
        assert_eq!(
            ProgressCounter::from_parts(1, 2, 0, Vec::new(), CountBound::Strict).unwrap_err(),
            CounterViolation::StartedExceedsCount {
                started: 2,
                count: 1
            }
        );
        assert_eq!(
            ProgressCounter::from_parts(3, 1, 2, Vec::new(), CountBound::Lenient).unwrap_err(),
            CounterViolation::CompletedExceedsStarted {
                completed: 2,
                started: 1
            }
        );
    }

    #[test]
    fn test_from_parts_lenient_allows_started_ahead_of_count() {
        let counter = ProgressCounter::from_parts(0, 1, 0, Vec::new(), CountBound::Lenient).unwrap();
        assert_eq!(counter.started(), 1);
        assert_eq!(counter.count(), 0);
        assert_eq!(counter.bound(), CountBound::Lenient);
    }

    #[test]
    fn test_started_ahead_of_count_survives_serde() {
        let mut counter = ProgressCounter::new();
        counter.begin(Some("ID1:NODE_LOCAL:h1(attempt 0)")).unwrap();

        let json = serde_json::to_string(&counter).unwrap();
        let back: ProgressCounter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, counter);
    }

    #[test]
    fn test_strict_bound_survives_serde() {
        let mut counter = ProgressCounter::new().with_bound(CountBound::Strict);
        counter.record_unit();
        counter.begin(Some("x")).unwrap();

        let json = serde_json::to_string(&counter).unwrap();
        assert!(json.contains(r#""bound":"strict""#));
        let back: ProgressCounter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, counter);
        assert_eq!(back.bound(), CountBound::Strict);
    }

    #[test]
    fn test_deserialize_strict_seed_checks_count() {
        let json = r#"{"count": 0, "started": 1, "completed": 0, "active": [], "bound": "strict"}"#;
        let err = serde_json::from_str::<ProgressCounter>(json).unwrap_err();
        assert!(err.to_string().contains("started (1) would exceed count (0)"));
    }

    #[test]
    fn test_deserialize_valid_seed() {
        let json = r#"{"count": 3, "started": 2, "completed": 1, "active": ["a"]}"#;
        let counter: ProgressCounter = serde_json::from_str(json).unwrap();
        assert_eq!(counter.count(), 3);
        assert_eq!(names(&counter), vec!["a"]);
    }

    #[test]
    fn test_deserialize_rejects_negative_seed() {
        let json = r#"{"count": 3, "started": -1, "completed": 0, "active": []}"#;
        let err = serde_json::from_str::<ProgressCounter>(json).unwrap_err();
        assert!(err.to_string().contains("started must be non-negative"));
    }

    #[test]
    fn test_deserialize_rejects_missing_active_set() {
        for json in [
            r#"{"count": 0, "started": 0, "completed": 0}"#,
            r#"{"count": 0, "started": 0, "completed": 0, "active": null}"#,
        ] {
            let err = serde_json::from_str::<ProgressCounter>(json).unwrap_err();
            assert!(err.to_string().contains("active set is missing"));
        }
    }
}
