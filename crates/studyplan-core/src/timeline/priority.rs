//! Task priority scoring.
//!
//! Combines three factors into one score:
//! - Urgency (inverse of days until due; undated tasks score zero)
//! - Grade weight (percentage of the final grade)
//! - Effort (a small boost so large tasks are not deferred forever)
//!
//! Urgency carries the largest share. Ties are broken by due date
//! ascending, weight descending, then task key, so ranking is total.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::{ValidatedTask, NEUTRAL_WEIGHT};

/// Priority calculation weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Weight for urgency (default 0.6)
    pub urgency_weight: f64,
    /// Weight for grade weight (default 0.3)
    pub grade_weight: f64,
    /// Weight for effort (default 0.1)
    pub effort_weight: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            urgency_weight: 0.6,
            grade_weight: 0.3,
            effort_weight: 0.1,
        }
    }
}

/// A validated task with its hour budget and priority score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTask {
    pub task: ValidatedTask,
    pub budget_hours: f64,
    pub score: f64,
}

impl RankedTask {
    /// Budget in whole minutes.
    pub fn budget_minutes(&self) -> i64 {
        (self.budget_hours * 60.0).round() as i64
    }
}

/// Priority scorer for tasks
pub struct PriorityScorer {
    weights: PriorityWeights,
}

impl PriorityScorer {
    /// Create a new scorer with default weights
    pub fn new() -> Self {
        Self {
            weights: PriorityWeights::default(),
        }
    }

    /// Create with custom weights
    pub fn with_weights(weights: PriorityWeights) -> Self {
        Self { weights }
    }

    /// Composite score for one task.
    pub fn score(&self, days_until_due: Option<i64>, weight: Option<f64>, effort_hours: f64) -> f64 {
        urgency_score(days_until_due) * self.weights.urgency_weight
            + weight.unwrap_or(NEUTRAL_WEIGHT) * self.weights.grade_weight
            + effort_score(effort_hours) * self.weights.effort_weight
    }

    /// Score every task and sort highest priority first.
    pub fn rank(&self, tasks: Vec<(ValidatedTask, f64)>, today: NaiveDate) -> Vec<RankedTask> {
        let mut ranked: Vec<RankedTask> = tasks
            .into_iter()
            .map(|(task, budget_hours)| {
                let score = self.score(task.days_until_due(today), task.weight, budget_hours);
                RankedTask {
                    task,
                    budget_hours,
                    score,
                }
            })
            .collect();

        ranked.sort_by(compare_ranked);
        ranked
    }
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Urgency (0-100): `100 / (days + 1)`, zero for undated tasks.
fn urgency_score(days_until_due: Option<i64>) -> f64 {
    match days_until_due {
        Some(days) => 100.0 / (days.max(0) as f64 + 1.0),
        None => 0.0,
    }
}

/// Effort (0-100): five points per budgeted hour.
fn effort_score(hours: f64) -> f64 {
    (hours.max(0.0) * 5.0).min(100.0)
}

fn compare_ranked(a: &RankedTask, b: &RankedTask) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| match (a.task.due, b.task.due) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| {
            let wa = a.task.weight.unwrap_or(NEUTRAL_WEIGHT);
            let wb = b.task.weight.unwrap_or(NEUTRAL_WEIGHT);
            wb.total_cmp(&wa)
        })
        .then_with(|| a.task.key.cmp(&b.task.key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn validated(id: &str, due: Option<&str>, weight: Option<f64>) -> ValidatedTask {
        let mut task = Task::new(id, format!("Task {id}"));
        task.due_date = due.map(str::to_string);
        task.weight = weight;
        task.validate(today()).unwrap()
    }

    #[test]
    fn urgency_dominates() {
        let scorer = PriorityScorer::new();
        let soon = scorer.score(Some(1), Some(10.0), 3.0);
        let later = scorer.score(Some(20), Some(40.0), 3.0);
        assert!(soon > later, "due tomorrow ({soon}) should beat heavier later task ({later})");
    }

    #[test]
    fn undated_tasks_have_no_urgency() {
        let scorer = PriorityScorer::new();
        assert!(scorer.score(None, Some(20.0), 4.0) < scorer.score(Some(30), Some(20.0), 4.0));
    }

    #[test]
    fn weight_and_effort_raise_score() {
        let scorer = PriorityScorer::new();
        assert!(scorer.score(Some(5), Some(50.0), 3.0) > scorer.score(Some(5), Some(10.0), 3.0));
        assert!(scorer.score(Some(5), Some(10.0), 12.0) > scorer.score(Some(5), Some(10.0), 3.0));
    }

    #[test]
    fn rank_orders_by_score() {
        let ranked = PriorityScorer::new().rank(
            vec![
                (validated("late", Some("2026-03-30"), Some(20.0)), 4.0),
                (validated("soon", Some("2026-03-04"), Some(20.0)), 4.0),
                (validated("undated", None, Some(20.0)), 4.0),
            ],
            today(),
        );
        let keys: Vec<_> = ranked.iter().map(|r| r.task.key.as_str()).collect();
        assert_eq!(keys, vec!["soon", "late", "undated"]);
    }

    #[test]
    fn ties_break_on_key() {
        let ranked = PriorityScorer::new().rank(
            vec![
                (validated("b", Some("2026-03-10"), Some(20.0)), 4.0),
                (validated("a", Some("2026-03-10"), Some(20.0)), 4.0),
            ],
            today(),
        );
        assert_eq!(ranked[0].task.key, "a");
        assert_eq!(ranked[1].task.key, "b");
    }

    #[test]
    fn budget_minutes_rounds() {
        let ranked = RankedTask {
            task: validated("a", None, None),
            budget_hours: 2.25,
            score: 0.0,
        };
        assert_eq!(ranked.budget_minutes(), 135);
    }
}
