//! Planning pipeline.
//!
//! One run goes through these steps in order: preferences are resolved
//! and tasks validated. Budgets are estimated and tasks ranked. Free
//! slots are computed, then the planner places sessions and the
//! assembler builds the plan. Every step is a pure function of the
//! request, so identical requests give identical plans.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::plan::{Plan, SkippedTask, TimelineAssembler};
use crate::preferences::{Preferences, ResolvedPreferences, MAX_PLANNING_DAYS};
use crate::scheduler::SessionPlanner;
use crate::task::{EffortEstimator, Task, TopicAllocation, ValidatedTask};
use crate::timeline::{
    analyze_availability, AvailabilityReport, BusyInterval, FreeSlot, FreeSlotCalculator,
    PriorityScorer, RankedTask,
};

/// Planning input as read from a file: preferences are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningInput {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub busy: Vec<BusyInterval>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

impl PlanningInput {
    /// Complete the input into a request. Embedded preferences win over `fallback`.
    pub fn into_request(self, fallback: Preferences, now: DateTime<Utc>) -> PlanningRequest {
        PlanningRequest {
            tasks: self.tasks,
            busy: self.busy,
            preferences: self.preferences.unwrap_or(fallback),
            now,
        }
    }
}

/// Everything one planning run depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRequest {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub busy: Vec<BusyInterval>,
    #[serde(default)]
    pub preferences: Preferences,
    /// Reference instant; its date is "today".
    pub now: DateTime<Utc>,
}

impl PlanningRequest {
    pub fn new(tasks: Vec<Task>, now: DateTime<Utc>) -> Self {
        Self {
            tasks,
            busy: Vec::new(),
            preferences: Preferences::default(),
            now,
        }
    }

    pub fn with_busy(mut self, busy: Vec<BusyInterval>) -> Self {
        self.busy = busy;
        self
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Validated, ranked inputs shared by plan generation and availability.
struct Prepared {
    prefs: ResolvedPreferences,
    ranked: Vec<RankedTask>,
    skipped: Vec<SkippedTask>,
    calendar: BTreeMap<NaiveDate, Vec<FreeSlot>>,
    warnings: Vec<String>,
}

impl Prepared {
    fn needed_hours(&self) -> f64 {
        self.ranked.iter().map(|t| t.budget_hours).sum()
    }
}

/// Runs the full planning pipeline.
pub struct PlanningEngine {
    estimator: EffortEstimator,
    scorer: PriorityScorer,
}

impl PlanningEngine {
    pub fn new() -> Self {
        Self {
            estimator: EffortEstimator::new(),
            scorer: PriorityScorer::new(),
        }
    }

    pub fn with_estimator(mut self, estimator: EffortEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_scorer(mut self, scorer: PriorityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Generate a study plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the preferences are invalid or the planner
    /// breaks a scheduling invariant. Bad tasks and unplaceable budgets
    /// are reported inside the plan instead.
    pub fn generate(&self, request: &PlanningRequest) -> Result<Plan> {
        let prepared = self.prepare(request)?;
        let availability = analyze_availability(
            &prepared.calendar,
            prepared.prefs.daily_cap_minutes,
            prepared.needed_hours(),
        );

        let outcome = SessionPlanner::new(prepared.prefs).plan(&prepared.ranked, &prepared.calendar)?;

        let topics: BTreeMap<String, Vec<TopicAllocation>> = prepared
            .ranked
            .iter()
            .filter(|r| !r.task.topics.is_empty())
            .map(|r| {
                (
                    r.task.key.clone(),
                    self.estimator.distribute(r.budget_hours, &r.task.topics),
                )
            })
            .collect();

        let mut warnings = prepared.warnings;
        warnings.extend(outcome.infeasible.iter().map(|t| {
            format!("'{}' is {:.2}h short: {}", t.title, t.shortfall_hours, t.reason)
        }));

        let plan = TimelineAssembler::new(plan_id(request)?, request.now).assemble(
            outcome,
            prepared.skipped,
            topics,
            availability,
            warnings,
        );

        tracing::info!(
            plan_id = %plan.id,
            sessions = plan.sessions.len(),
            total_hours = plan.summary.total_hours,
            tasks_scheduled = plan.summary.tasks_scheduled,
            infeasible = plan.infeasible_tasks.len(),
            skipped = plan.skipped_tasks.len(),
            "study plan generated"
        );
        Ok(plan)
    }

    /// Analyze free time over the horizon without placing sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the preferences are invalid.
    pub fn availability(&self, request: &PlanningRequest) -> Result<AvailabilityReport> {
        let prepared = self.prepare(request)?;
        Ok(analyze_availability(
            &prepared.calendar,
            prepared.prefs.daily_cap_minutes,
            prepared.needed_hours(),
        ))
    }

    fn prepare(&self, request: &PlanningRequest) -> Result<Prepared> {
        let prefs = request.preferences.resolve()?;
        let today = request.today();
        let mut warnings = Vec::new();

        let (valid, skipped) = validate_tasks(&request.tasks, today);

        let budgeted: Vec<(ValidatedTask, f64)> = valid
            .into_iter()
            .map(|task| {
                let hours = match task.effort_hours {
                    Some(hours) => hours,
                    None => {
                        let days = task.days_until_due(today).unwrap_or(prefs.horizon_days);
                        self.estimator.estimate(task.weight, days)
                    }
                };
                (task, hours)
            })
            .collect();
        let ranked = self.scorer.rank(budgeted, today);

        let busy: Vec<BusyInterval> = request
            .busy
            .iter()
            .filter(|b| {
                if b.is_valid() {
                    return true;
                }
                tracing::warn!(label = %b.label, start = %b.start, end = %b.end, "ignoring inverted busy interval");
                warnings.push(format!(
                    "ignored busy interval '{}': end {} is not after start {}",
                    b.label, b.end, b.start
                ));
                false
            })
            .cloned()
            .collect();

        let last_due = ranked
            .iter()
            .filter_map(|r| r.task.days_until_due(today))
            .max()
            .unwrap_or(0);
        let horizon = prefs
            .horizon_days
            .max(last_due)
            .min(i64::from(MAX_PLANNING_DAYS));

        let calendar = FreeSlotCalculator::from_preferences(&prefs).free_slots_for_range(
            today,
            horizon,
            &busy,
            Some(request.now),
        );

        tracing::debug!(
            %today,
            horizon_days = horizon,
            tasks = ranked.len(),
            busy = busy.len(),
            "prepared planning inputs"
        );

        Ok(Prepared {
            prefs,
            ranked,
            skipped,
            calendar,
            warnings,
        })
    }
}

impl Default for PlanningEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a plan with the default estimator and scorer.
///
/// # Errors
///
/// See [`PlanningEngine::generate`].
pub fn generate_plan(request: &PlanningRequest) -> Result<Plan> {
    PlanningEngine::new().generate(request)
}

/// Split tasks into plannable ones and skipped ones. Completed tasks are dropped.
fn validate_tasks(tasks: &[Task], today: NaiveDate) -> (Vec<ValidatedTask>, Vec<SkippedTask>) {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = BTreeSet::new();

    for task in tasks.iter().filter(|t| !t.completed) {
        let result = task.validate(today).map_err(|issue| issue.to_string()).and_then(|v| {
            if seen.insert(v.key.clone()) {
                Ok(v)
            } else {
                Err(format!("duplicate task id '{}'", v.key))
            }
        });
        match result {
            Ok(v) => valid.push(v),
            Err(reason) => {
                tracing::warn!(task = %task.key(), %reason, "skipping task");
                skipped.push(SkippedTask {
                    task_id: task.key().to_string(),
                    title: task.title.clone(),
                    reason,
                });
            }
        }
    }
    (valid, skipped)
}

/// Deterministic id derived from the request contents.
fn plan_id(request: &PlanningRequest) -> Result<String> {
    let bytes = serde_json::to_vec(request)?;
    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, &bytes).to_string())
}
