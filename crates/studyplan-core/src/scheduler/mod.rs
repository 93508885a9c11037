//! Greedy study-session planner.
//!
//! Tasks are taken in priority order. For each task the planner walks
//! the free-slot calendar forward from today and carves sessions out of
//! the slots until the task's budget is placed or its due-date boundary
//! is reached. Slot capacity and daily capacity are consumed in place,
//! so earlier tasks get first claim on the calendar.
//!
//! When the normal rules leave budget unplaced, the planner relaxes them
//! in a fixed order:
//! 1. spacing between sessions of the same task shrinks to one day,
//! 2. then to zero (several sessions per day),
//! 3. then the buffer days before the due date are opened.
//!
//! Whatever still does not fit is reported as a shortfall.

mod reason;

use std::collections::BTreeMap;

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::preferences::ResolvedPreferences;
use crate::task::NEUTRAL_WEIGHT;
use crate::timeline::{minutes_to_hours, FreeSlot, RankedTask};

use reason::SessionReason;

/// Budgets at or above this many minutes always use full-length sessions
const LARGE_BUDGET_MINUTES: i64 = 8 * 60;
/// Weights at or above this always use full-length sessions
const HEAVY_WEIGHT: f64 = 25.0;
/// Preferred session lengths are rounded up to this granularity
const CHUNK_GRANULARITY_MINUTES: i64 = 15;

/// A single scheduled study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub task_id: String,
    pub task_title: String,
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub duration_hours: f64,
    /// 1-based position of this session within its task
    pub session_index: u32,
    pub session_count: u32,
    pub reason: String,
}

/// A task whose budget could not be fully placed before its due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfeasibleTask {
    pub task_id: String,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub budget_hours: f64,
    pub scheduled_hours: f64,
    pub shortfall_hours: f64,
    pub shortfall_minutes: i64,
    pub reason: String,
}

/// Per-task allocation result, in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub key: String,
    pub title: String,
    pub score: f64,
    pub budget_minutes: i64,
    pub scheduled_minutes: i64,
}

/// Everything the planner produced for one run.
#[derive(Debug, Clone, Default)]
pub struct PlannerOutcome {
    /// Sessions ordered by start time
    pub sessions: Vec<StudySession>,
    pub infeasible: Vec<InfeasibleTask>,
    pub tasks: Vec<TaskOutcome>,
}

/// One relaxation level of the placement rules.
#[derive(Debug, Clone, Copy)]
struct Phase {
    spacing_days: i64,
    /// Exclusive upper bound on session dates
    bound: NaiveDate,
    relaxed_spacing: bool,
}

#[derive(Debug, Clone)]
struct SlotState {
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SlotState {
    fn remaining_minutes(&self) -> i64 {
        (self.end - self.cursor).num_minutes().max(0)
    }
}

#[derive(Debug, Clone)]
struct DayState {
    date: NaiveDate,
    slots: Vec<SlotState>,
    used_minutes: i64,
}

#[derive(Debug, Clone)]
struct Placement {
    date: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    minutes: i64,
    relaxed_spacing: bool,
    in_buffer: bool,
}

/// Greedy planner over a fixed free-slot calendar.
pub struct SessionPlanner {
    prefs: ResolvedPreferences,
}

impl SessionPlanner {
    pub fn new(prefs: ResolvedPreferences) -> Self {
        Self { prefs }
    }

    /// Place sessions for `tasks` (already ranked) into `calendar`.
    ///
    /// # Arguments
    /// * `tasks` - Ranked tasks, highest priority first
    /// * `calendar` - Free slots per date; its first key is "today"
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvariantViolation`] if the produced sessions
    /// break a scheduling guarantee. That indicates a defect, not bad input.
    pub fn plan(
        &self,
        tasks: &[RankedTask],
        calendar: &BTreeMap<NaiveDate, Vec<FreeSlot>>,
    ) -> Result<PlannerOutcome> {
        let mut days: Vec<DayState> = calendar
            .iter()
            .map(|(date, slots)| DayState {
                date: *date,
                slots: slots
                    .iter()
                    .map(|s| SlotState {
                        cursor: s.start,
                        end: s.end,
                    })
                    .collect(),
                used_minutes: 0,
            })
            .collect();

        let horizon_end = match days.last() {
            Some(day) => day.date + Duration::days(1),
            None => return Ok(self.nothing_placed(tasks)),
        };

        let mut outcome = PlannerOutcome::default();

        for ranked in tasks {
            let budget = ranked.budget_minutes();
            let placements = self.place_task(ranked, budget, &mut days, horizon_end);
            let scheduled: i64 = placements.iter().map(|p| p.minutes).sum();

            if scheduled < budget {
                let infeasible = self.infeasible(ranked, budget, scheduled);
                tracing::warn!(
                    task = %ranked.task.key,
                    shortfall_minutes = infeasible.shortfall_minutes,
                    "task could not be fully scheduled"
                );
                outcome.infeasible.push(infeasible);
            }

            outcome
                .sessions
                .extend(self.finish_sessions(ranked, placements));
            outcome.tasks.push(TaskOutcome {
                key: ranked.task.key.clone(),
                title: ranked.task.title.clone(),
                score: ranked.score,
                budget_minutes: budget,
                scheduled_minutes: scheduled,
            });
        }

        outcome
            .sessions
            .sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.task_id.cmp(&b.task_id)));

        self.check_invariants(&outcome.sessions, tasks)?;
        Ok(outcome)
    }

    fn nothing_placed(&self, tasks: &[RankedTask]) -> PlannerOutcome {
        PlannerOutcome {
            sessions: Vec::new(),
            infeasible: tasks
                .iter()
                .map(|t| self.infeasible(t, t.budget_minutes(), 0))
                .collect(),
            tasks: tasks
                .iter()
                .map(|t| TaskOutcome {
                    key: t.task.key.clone(),
                    title: t.task.title.clone(),
                    score: t.score,
                    budget_minutes: t.budget_minutes(),
                    scheduled_minutes: 0,
                })
                .collect(),
        }
    }

    /// First day of the deadline buffer before `due`.
    fn buffer_start(&self, due: NaiveDate) -> NaiveDate {
        let buffer = Days::new(u64::try_from(self.prefs.buffer_days).unwrap_or(0));
        due.checked_sub_days(buffer).unwrap_or(NaiveDate::MIN)
    }

    /// Relaxation phases for one task, strictest first.
    fn phases(&self, ranked: &RankedTask, horizon_end: NaiveDate) -> Vec<Phase> {
        let (normal_bound, hard_bound) = match ranked.task.due {
            Some(due) => (
                self.buffer_start(due).min(horizon_end),
                due.min(horizon_end),
            ),
            None => (horizon_end, horizon_end),
        };

        let spacing = self.prefs.spacing_days;
        let mut phases = vec![Phase {
            spacing_days: spacing,
            bound: normal_bound,
            relaxed_spacing: false,
        }];
        if spacing > 1 {
            phases.push(Phase {
                spacing_days: 1,
                bound: normal_bound,
                relaxed_spacing: true,
            });
        }
        if spacing > 0 {
            phases.push(Phase {
                spacing_days: 0,
                bound: normal_bound,
                relaxed_spacing: true,
            });
        }
        if hard_bound > normal_bound {
            phases.push(Phase {
                spacing_days: 0,
                bound: hard_bound,
                relaxed_spacing: spacing > 0,
            });
        }
        phases
    }

    fn place_task(
        &self,
        ranked: &RankedTask,
        budget: i64,
        days: &mut [DayState],
        horizon_end: NaiveDate,
    ) -> Vec<Placement> {
        let mut placements: Vec<Placement> = Vec::new();
        let mut remaining = budget;
        if remaining <= 0 {
            return placements;
        }

        let preferred = self.preferred_chunk(ranked, budget);
        let normal_bound = ranked.task.due.map(|due| self.buffer_start(due));

        for phase in self.phases(ranked, horizon_end) {
            for day in days.iter_mut() {
                if remaining == 0 || day.date >= phase.bound {
                    break;
                }
                for slot in day.slots.iter_mut() {
                    while remaining > 0 && spacing_ok(&placements, day.date, phase.spacing_days) {
                        let day_left = self.prefs.daily_cap_minutes - day.used_minutes;
                        let chunk = self.carve(preferred, remaining, slot.remaining_minutes(), day_left);
                        if chunk <= 0 {
                            break;
                        }
                        // a short final session must come after every other one
                        if chunk < self.prefs.min_session_minutes
                            && placements.iter().any(|p| p.start >= slot.cursor)
                        {
                            break;
                        }

                        let start = slot.cursor;
                        let end = start + Duration::minutes(chunk);
                        slot.cursor = end + Duration::minutes(self.prefs.break_minutes);
                        if slot.cursor > slot.end {
                            slot.cursor = slot.end;
                        }
                        day.used_minutes += chunk;
                        remaining -= chunk;

                        tracing::debug!(
                            task = %ranked.task.key,
                            date = %day.date,
                            %start,
                            minutes = chunk,
                            relaxed = phase.relaxed_spacing,
                            "placed study session"
                        );

                        let relaxed_spacing = phase.relaxed_spacing
                            && !spacing_ok(&placements, day.date, self.prefs.spacing_days);
                        placements.push(Placement {
                            date: day.date,
                            start,
                            end,
                            minutes: chunk,
                            relaxed_spacing,
                            in_buffer: normal_bound.is_some_and(|b| day.date >= b),
                        });
                    }
                    if remaining == 0 {
                        break;
                    }
                }
            }
            if remaining == 0 {
                break;
            }
        }

        placements
    }

    /// Session length this task would like, before capacity limits.
    fn preferred_chunk(&self, ranked: &RankedTask, budget: i64) -> i64 {
        let min = self.prefs.min_session_minutes;
        let max = self.prefs.max_session_minutes;
        let weight = ranked.task.weight.unwrap_or(NEUTRAL_WEIGHT);
        if weight >= HEAVY_WEIGHT || budget >= LARGE_BUDGET_MINUTES {
            return max;
        }
        let third = budget / 3;
        let rounded = (third + CHUNK_GRANULARITY_MINUTES - 1) / CHUNK_GRANULARITY_MINUTES
            * CHUNK_GRANULARITY_MINUTES;
        rounded.clamp(min, max)
    }

    /// Minutes to place in a slot, or 0 when nothing acceptable fits.
    ///
    /// A session is at least the minimum length, except the final
    /// session of a task, which may be shorter to use up the remainder.
    /// A chunk that would leave less than the minimum behind is shrunk
    /// so the remainder still makes a full session, when it can.
    fn carve(&self, preferred: i64, remaining: i64, slot_left: i64, day_left: i64) -> i64 {
        let min = self.prefs.min_session_minutes;
        let max = self.prefs.max_session_minutes;

        let mut desired = preferred.min(remaining);
        let tail = remaining - desired;
        if tail > 0 && tail < min && remaining <= max {
            desired = remaining;
        }

        let mut chunk = desired.min(slot_left).min(day_left).min(max);
        if chunk <= 0 {
            return 0;
        }
        let leftover = remaining - chunk;
        if leftover > 0 && leftover < min && remaining - min >= min {
            chunk = remaining - min;
        }
        if chunk >= min || chunk == remaining {
            chunk
        } else {
            0
        }
    }

    fn finish_sessions(&self, ranked: &RankedTask, mut placements: Vec<Placement>) -> Vec<StudySession> {
        placements.sort_by_key(|p| p.start);
        let count = placements.len() as u32;

        placements
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let index = i as u32 + 1;
                let reason = SessionReason {
                    days_until_due: ranked.task.due.map(|due| (due - p.date).num_days()),
                    weight: ranked.task.weight,
                    index,
                    count,
                    relaxed_spacing: p.relaxed_spacing,
                    in_buffer: p.in_buffer,
                };
                StudySession {
                    task_id: ranked.task.key.clone(),
                    task_title: ranked.task.title.clone(),
                    date: p.date,
                    start: p.start,
                    end: p.end,
                    duration_minutes: p.minutes,
                    duration_hours: minutes_to_hours(p.minutes),
                    session_index: index,
                    session_count: count,
                    reason: reason.to_string(),
                }
            })
            .collect()
    }

    fn infeasible(&self, ranked: &RankedTask, budget: i64, scheduled: i64) -> InfeasibleTask {
        let shortfall = budget - scheduled;
        let reason = if scheduled == 0 {
            "no usable study time before the due date".to_string()
        } else {
            format!(
                "only {:.2}h of {:.2}h fit before the due date",
                minutes_to_hours(scheduled),
                minutes_to_hours(budget)
            )
        };
        InfeasibleTask {
            task_id: ranked.task.key.clone(),
            title: ranked.task.title.clone(),
            due_date: ranked.task.due,
            budget_hours: minutes_to_hours(budget),
            scheduled_hours: minutes_to_hours(scheduled),
            shortfall_hours: minutes_to_hours(shortfall),
            shortfall_minutes: shortfall,
            reason,
        }
    }

    /// Re-check the guarantees on the final session list.
    fn check_invariants(&self, sessions: &[StudySession], tasks: &[RankedTask]) -> Result<()> {
        let mut per_day: BTreeMap<NaiveDate, Vec<&StudySession>> = BTreeMap::new();
        for session in sessions {
            if session.duration_minutes <= 0 || session.end <= session.start {
                return Err(CoreError::InvariantViolation(format!(
                    "non-positive session duration for task '{}' on {}",
                    session.task_id, session.date
                )));
            }
            let is_final = session.session_index == session.session_count;
            if session.duration_minutes > self.prefs.max_session_minutes
                || (!is_final && session.duration_minutes < self.prefs.min_session_minutes)
            {
                return Err(CoreError::InvariantViolation(format!(
                    "session {}/{} of task '{}' is {} minutes, outside the session length bounds",
                    session.session_index,
                    session.session_count,
                    session.task_id,
                    session.duration_minutes
                )));
            }
            per_day.entry(session.date).or_default().push(session);
        }

        for (date, day_sessions) in &per_day {
            let total: i64 = day_sessions.iter().map(|s| s.duration_minutes).sum();
            if total > self.prefs.daily_cap_minutes {
                return Err(CoreError::InvariantViolation(format!(
                    "{total} minutes scheduled on {date}, above the daily cap"
                )));
            }
            for pair in day_sessions.windows(2) {
                if pair[1].start < pair[0].end {
                    return Err(CoreError::InvariantViolation(format!(
                        "overlapping sessions on {date}"
                    )));
                }
            }
        }

        for ranked in tasks {
            if let Some(due) = ranked.task.due {
                if sessions
                    .iter()
                    .any(|s| s.task_id == ranked.task.key && s.date >= due)
                {
                    return Err(CoreError::InvariantViolation(format!(
                        "task '{}' has a session on or after its due date",
                        ranked.task.key
                    )));
                }
            }
        }

        Ok(())
    }
}

/// `date` is at least `spacing_days` away from every placed session.
fn spacing_ok(placements: &[Placement], date: NaiveDate, spacing_days: i64) -> bool {
    spacing_days == 0
        || placements
            .iter()
            .all(|p| (date - p.date).num_days().abs() >= spacing_days)
}
