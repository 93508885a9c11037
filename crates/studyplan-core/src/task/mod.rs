//! Academic task types and per-task input validation.
//!
//! Tasks arrive from the extraction collaborator with loosely-typed
//! fields (the due date is a raw string). [`Task::validate`] turns a task
//! into a [`ValidatedTask`] or explains why it cannot be planned.

pub mod effort;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use effort::{
    estimate_effort_hours, EffortConfig, EffortEstimator, SubTopic, TopicAllocation,
    NEUTRAL_WEIGHT,
};

/// Kind of academic task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Assignment,
    Exam,
    Project,
    Quiz,
    Reading,
    Other,
}

impl Default for TaskCategory {
    fn default() -> Self {
        TaskCategory::Other
    }
}

/// A weighted, optionally dated academic task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier; when empty the title is used as the task key.
    #[serde(default)]
    pub id: String,
    pub title: String,
    /// `YYYY-MM-DD` or RFC 3339. Undated tasks may be planned anywhere in the horizon.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub category: TaskCategory,
    /// Percentage of the final grade, 0-100.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Pre-estimated effort; estimated from weight and horizon when absent.
    #[serde(default)]
    pub effort_hours: Option<f64>,
    #[serde(default)]
    pub completed: bool,
    /// Sub-topic decomposition supplied by the content collaborator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<SubTopic>,
}

impl Task {
    /// Create an undated task with default category.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            due_date: None,
            category: TaskCategory::default(),
            weight: None,
            effort_hours: None,
            completed: false,
            topics: Vec::new(),
        }
    }

    pub fn with_due_date(mut self, due: impl Into<String>) -> Self {
        self.due_date = Some(due.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_effort_hours(mut self, hours: f64) -> Self {
        self.effort_hours = Some(hours);
        self
    }

    pub fn with_category(mut self, category: TaskCategory) -> Self {
        self.category = category;
        self
    }

    /// Stable key: the id, or the title when no id was supplied.
    pub fn key(&self) -> &str {
        if self.id.trim().is_empty() {
            &self.title
        } else {
            &self.id
        }
    }

    /// Check the task against `today` and normalize its fields.
    ///
    /// # Errors
    ///
    /// Returns the [`TaskIssue`] that excludes this task from planning.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidatedTask, TaskIssue> {
        if self.title.trim().is_empty() && self.id.trim().is_empty() {
            return Err(TaskIssue::MissingTitle);
        }

        let due = match self.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let due = parse_due_date(raw)
                    .ok_or_else(|| TaskIssue::UnparseableDueDate(raw.to_string()))?;
                if due < today {
                    return Err(TaskIssue::PastDueDate(due));
                }
                Some(due)
            }
        };

        if let Some(weight) = self.weight {
            if !weight.is_finite() || !(0.0..=100.0).contains(&weight) {
                return Err(TaskIssue::WeightOutOfRange(weight));
            }
        }

        if let Some(hours) = self.effort_hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(TaskIssue::NegativeEffort(hours));
            }
            if hours == 0.0 {
                return Err(TaskIssue::NoEffortRequired);
            }
        }

        Ok(ValidatedTask {
            key: self.key().to_string(),
            title: self.title.clone(),
            category: self.category,
            due,
            weight: self.weight,
            effort_hours: self.effort_hours,
            topics: self.topics.clone(),
        })
    }
}

/// Parse a due date given as a calendar date or a timestamp.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|ts| ts.date())
}

/// Reason a task was excluded from planning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskIssue {
    #[error("task has neither a title nor an id")]
    MissingTitle,

    #[error("unparseable due date '{0}'")]
    UnparseableDueDate(String),

    #[error("due date {0} is in the past")]
    PastDueDate(NaiveDate),

    #[error("weight {0} is outside 0-100")]
    WeightOutOfRange(f64),

    #[error("effort hours {0} is negative")]
    NegativeEffort(f64),

    #[error("no study time required")]
    NoEffortRequired,
}

/// A task that passed validation, with its due date parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTask {
    pub key: String,
    pub title: String,
    pub category: TaskCategory,
    pub due: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub effort_hours: Option<f64>,
    pub topics: Vec<SubTopic>,
}

impl ValidatedTask {
    /// Whole days from `today` until the due date, if any.
    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.due.map(|due| (due - today).num_days())
    }
}
