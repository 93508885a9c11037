//! Plan assembly: the final, immutable result of one planning run.
//!
//! [`TimelineAssembler`] groups the planner's flat session list by date
//! and computes the aggregate totals. It makes no scheduling decisions.

pub mod feedback;
mod render;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::{InfeasibleTask, PlannerOutcome, StudySession};
use crate::task::TopicAllocation;
use crate::timeline::{minutes_to_hours, round2, AvailabilityReport};

pub use feedback::PlanFeedback;

/// A task excluded from planning because its input was malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTask {
    pub task_id: String,
    pub title: String,
    pub reason: String,
}

/// Sessions scheduled on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub day_name: String,
    pub total_minutes: i64,
    pub total_hours: f64,
    pub sessions: Vec<StudySession>,
}

/// Budget and allocation for one planned task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBudget {
    pub task_id: String,
    pub title: String,
    pub priority_score: f64,
    pub budget_hours: f64,
    pub scheduled_hours: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<TopicAllocation>,
}

/// Top-level aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_hours: f64,
    pub total_minutes: i64,
    /// Tasks with at least one placed session
    pub tasks_scheduled: usize,
    pub days_covered: usize,
    pub average_hours_per_day: f64,
    pub busiest_day: Option<NaiveDate>,
    pub busiest_day_hours: f64,
}

/// A complete study plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub summary: PlanSummary,
    /// All sessions ordered by start time
    pub sessions: Vec<StudySession>,
    pub days: Vec<DayPlan>,
    pub task_budgets: Vec<TaskBudget>,
    pub infeasible_tasks: Vec<InfeasibleTask>,
    pub skipped_tasks: Vec<SkippedTask>,
    pub warnings: Vec<String>,
    pub availability: AvailabilityReport,
}

impl Plan {
    /// The sessions planned for `date`, if any.
    pub fn day(&self, date: NaiveDate) -> Option<&DayPlan> {
        self.days.iter().find(|d| d.date == date)
    }

    /// Sessions of a single task, in order.
    pub fn sessions_for_task<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a StudySession> + 'a {
        self.sessions.iter().filter(move |s| s.task_id == task_id)
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Human-readable rendering of the whole plan.
    pub fn render_text(&self) -> String {
        render::render_plan(self)
    }
}

/// Groups sessions into a [`Plan`].
pub struct TimelineAssembler {
    id: String,
    generated_at: DateTime<Utc>,
}

impl TimelineAssembler {
    pub fn new(id: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            generated_at,
        }
    }

    /// Build the plan from the planner outcome and the run's side reports.
    pub fn assemble(
        &self,
        outcome: PlannerOutcome,
        skipped_tasks: Vec<SkippedTask>,
        mut topics: BTreeMap<String, Vec<TopicAllocation>>,
        availability: AvailabilityReport,
        warnings: Vec<String>,
    ) -> Plan {
        let mut by_date: BTreeMap<NaiveDate, Vec<StudySession>> = BTreeMap::new();
        for session in &outcome.sessions {
            by_date.entry(session.date).or_default().push(session.clone());
        }

        let days: Vec<DayPlan> = by_date
            .into_iter()
            .map(|(date, sessions)| {
                let total: i64 = sessions.iter().map(|s| s.duration_minutes).sum();
                DayPlan {
                    date,
                    day_name: date.format("%A").to_string(),
                    total_minutes: total,
                    total_hours: minutes_to_hours(total),
                    sessions,
                }
            })
            .collect();

        let total_minutes: i64 = outcome.sessions.iter().map(|s| s.duration_minutes).sum();
        let busiest = days
            .iter()
            .max_by(|a, b| a.total_minutes.cmp(&b.total_minutes).then(b.date.cmp(&a.date)));
        let average = if days.is_empty() {
            0.0
        } else {
            round2(total_minutes as f64 / 60.0 / days.len() as f64)
        };

        let summary = PlanSummary {
            total_hours: minutes_to_hours(total_minutes),
            total_minutes,
            tasks_scheduled: outcome.tasks.iter().filter(|t| t.scheduled_minutes > 0).count(),
            days_covered: days.len(),
            average_hours_per_day: average,
            busiest_day: busiest.map(|d| d.date),
            busiest_day_hours: busiest.map(|d| d.total_hours).unwrap_or(0.0),
        };

        let task_budgets = outcome
            .tasks
            .iter()
            .map(|t| TaskBudget {
                task_id: t.key.clone(),
                title: t.title.clone(),
                priority_score: round2(t.score),
                budget_hours: minutes_to_hours(t.budget_minutes),
                scheduled_hours: minutes_to_hours(t.scheduled_minutes),
                topics: topics.remove(&t.key).unwrap_or_default(),
            })
            .collect();

        Plan {
            id: self.id.clone(),
            generated_at: self.generated_at,
            summary,
            sessions: outcome.sessions,
            days,
            task_budgets,
            infeasible_tasks: outcome.infeasible,
            skipped_tasks,
            warnings,
            availability,
        }
    }
}
