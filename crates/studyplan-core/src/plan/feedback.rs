//! User feedback on a generated plan.
//!
//! Feedback never patches a plan. It rewrites the request that produced
//! the plan, and the caller regenerates from the new request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::PlanningRequest;
use crate::error::ValidationError;
use crate::timeline::BusyInterval;

/// A single feedback action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanFeedback {
    /// Reserve time that was not on the calendar.
    BlockTime {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        label: String,
    },
    /// The task needs no further study.
    MarkComplete { task_id: String },
    /// Override the task's effort estimate.
    AdjustEffort { task_id: String, hours: f64 },
    /// Regenerate without changing anything.
    Reschedule,
}

impl PlanFeedback {
    /// Return the request with this feedback applied.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an unknown task id, an inverted
    /// time range, or a non-positive effort.
    pub fn apply(&self, request: &PlanningRequest) -> Result<PlanningRequest, ValidationError> {
        let mut next = request.clone();
        match self {
            PlanFeedback::BlockTime { start, end, label } => {
                if start >= end {
                    return Err(ValidationError::InvalidTimeRange {
                        start: start.to_rfc3339(),
                        end: end.to_rfc3339(),
                    });
                }
                let label = if label.is_empty() { "blocked" } else { label.as_str() };
                next.busy.push(BusyInterval::new(*start, *end, label));
            }
            PlanFeedback::MarkComplete { task_id } => {
                let task = next
                    .tasks
                    .iter_mut()
                    .find(|t| t.key() == task_id)
                    .ok_or_else(|| ValidationError::UnknownTask(task_id.clone()))?;
                task.completed = true;
            }
            PlanFeedback::AdjustEffort { task_id, hours } => {
                if !hours.is_finite() || *hours <= 0.0 {
                    return Err(ValidationError::invalid(
                        "hours",
                        format!("{hours} must be a positive number of hours"),
                    ));
                }
                let task = next
                    .tasks
                    .iter_mut()
                    .find(|t| t.key() == task_id)
                    .ok_or_else(|| ValidationError::UnknownTask(task_id.clone()))?;
                task.effort_hours = Some(*hours);
            }
            PlanFeedback::Reschedule => {}
        }
        tracing::debug!(feedback = ?self, "applied plan feedback");
        Ok(next)
    }
}
