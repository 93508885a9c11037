//! End-to-end planning tests: scheduling guarantees and worked scenarios.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use studyplan_core::task::parse_due_date;
use studyplan_core::{
    generate_plan, BusyInterval, Plan, PlanningRequest, Preferences, Task,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    now().date_naive()
}

fn day(offset: i64) -> String {
    (today() + Duration::days(offset)).format("%Y-%m-%d").to_string()
}

fn evening_prefs() -> Preferences {
    Preferences {
        max_hours_per_day: 3.0,
        preferred_start: "18:00".into(),
        preferred_end: "21:00".into(),
        min_session_minutes: 60,
        max_session_minutes: 120,
        ..Preferences::default()
    }
}

/// Check every scheduling guarantee on a generated plan.
fn check_guarantees(request: &PlanningRequest, plan: &Plan) -> Result<(), TestCaseError> {
    let prefs = request.preferences.resolve().unwrap();
    let buffer = Duration::minutes(prefs.busy_buffer_minutes);

    let mut per_day: BTreeMap<NaiveDate, Vec<_>> = BTreeMap::new();
    for s in &plan.sessions {
        prop_assert!(s.duration_minutes > 0);
        prop_assert_eq!((s.end - s.start).num_minutes(), s.duration_minutes);
        prop_assert!(s.start >= request.now, "session starts before now");
        prop_assert!(s.start.time() >= prefs.window_start);
        prop_assert!(s.end.time() <= prefs.window_end);
        prop_assert_eq!(s.start.date_naive(), s.date);
        for b in request.busy.iter().filter(|b| b.is_valid()) {
            prop_assert!(
                !b.overlaps_with_buffer(s.start, s.end, buffer),
                "session {}..{} hits busy {}..{}",
                s.start,
                s.end,
                b.start,
                b.end
            );
        }
        per_day.entry(s.date).or_default().push(s);
    }

    for sessions in per_day.values_mut() {
        let total: i64 = sessions.iter().map(|s| s.duration_minutes).sum();
        prop_assert!(total <= prefs.daily_cap_minutes);
        sessions.sort_by_key(|s| s.start);
        for pair in sessions.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start, "overlapping sessions");
        }
    }

    let mut per_task: BTreeMap<&str, Vec<_>> = BTreeMap::new();
    for s in &plan.sessions {
        per_task.entry(s.task_id.as_str()).or_default().push(s);
    }
    for sessions in per_task.values_mut() {
        sessions.sort_by_key(|s| s.start);
        let count = sessions.len();
        for (i, s) in sessions.iter().enumerate() {
            prop_assert_eq!(s.session_index as usize, i + 1);
            prop_assert_eq!(s.session_count as usize, count);
            prop_assert!(
                s.duration_minutes <= prefs.max_session_minutes,
                "session {}/{} of {} is {}m",
                s.session_index,
                count,
                s.task_id,
                s.duration_minutes
            );
            if i + 1 < count {
                prop_assert!(
                    s.duration_minutes >= prefs.min_session_minutes,
                    "non-final session {}/{} of {} is {}m",
                    s.session_index,
                    count,
                    s.task_id,
                    s.duration_minutes
                );
            }
        }
    }

    let due_by_key: HashMap<&str, Option<NaiveDate>> = request
        .tasks
        .iter()
        .map(|t| (t.key(), t.due_date.as_deref().and_then(parse_due_date)))
        .collect();

    for budget in &plan.task_budgets {
        let budget_minutes = (budget.budget_hours * 60.0).round() as i64;
        let scheduled: i64 = plan
            .sessions_for_task(&budget.task_id)
            .map(|s| s.duration_minutes)
            .sum();
        let shortfall = plan
            .infeasible_tasks
            .iter()
            .find(|t| t.task_id == budget.task_id)
            .map(|t| t.shortfall_minutes)
            .unwrap_or(0);
        prop_assert_eq!(scheduled + shortfall, budget_minutes);

        if let Some(Some(due)) = due_by_key.get(budget.task_id.as_str()) {
            prop_assert!(plan
                .sessions_for_task(&budget.task_id)
                .all(|s| s.date < *due));
        }
    }

    let total: i64 = plan.sessions.iter().map(|s| s.duration_minutes).sum();
    prop_assert_eq!(plan.summary.total_minutes, total);
    Ok(())
}

fn tasks_strategy() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(
        (
            prop::option::of(0i64..20),
            prop::option::of(0u32..=100),
            prop::option::of(1u32..40),
        ),
        0..8,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (due, weight, quarters))| {
                let mut task = Task::new(format!("t{i}"), format!("Task {i}"));
                if let Some(offset) = due {
                    task = task.with_due_date(day(offset));
                }
                if let Some(w) = weight {
                    task = task.with_weight(f64::from(w));
                }
                if let Some(q) = quarters {
                    task = task.with_effort_hours(f64::from(q) * 0.25);
                }
                task
            })
            .collect()
    })
}

fn busy_strategy() -> impl Strategy<Value = Vec<BusyInterval>> {
    prop::collection::vec((0i64..16, 6 * 60i64..23 * 60, 15i64..300), 0..10).prop_map(|specs| {
        specs
            .into_iter()
            .map(|(offset, minute, len)| {
                let start = (today() + Duration::days(offset))
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    .and_utc()
                    + Duration::minutes(minute);
                BusyInterval::new(start, start + Duration::minutes(len), "busy")
            })
            .collect()
    })
}

fn prefs_strategy() -> impl Strategy<Value = Preferences> {
    (
        1u32..=6,
        6u32..18,
        2u32..=6,
        prop::sample::select(vec![15u32, 30, 45, 60]),
        prop::sample::select(vec![0u32, 30, 60, 90]),
        0u32..=3,
        0u32..=2,
        0u32..=20,
        0u32..=15,
    )
        .prop_map(
            |(hours, start, len, min, extra, spacing, buffer, brk, busy_buffer)| Preferences {
                max_hours_per_day: f64::from(hours),
                preferred_start: format!("{start:02}:00"),
                preferred_end: format!("{:02}:00", start + len),
                min_session_minutes: min,
                max_session_minutes: min + extra,
                break_minutes: brk,
                buffer_days: buffer,
                spacing_days: spacing,
                busy_buffer_minutes: busy_buffer,
                horizon_days: 14,
            },
        )
}

proptest! {
    #[test]
    fn prop_plans_keep_every_guarantee(
        tasks in tasks_strategy(),
        busy in busy_strategy(),
        prefs in prefs_strategy(),
        now_offset in 0i64..(24 * 60),
    ) {
        let request = PlanningRequest::new(tasks, now() - Duration::hours(8) + Duration::minutes(now_offset))
            .with_busy(busy)
            .with_preferences(prefs);
        let plan = generate_plan(&request).unwrap();
        check_guarantees(&request, &plan)?;
    }

    #[test]
    fn prop_generation_is_deterministic(
        tasks in tasks_strategy(),
        busy in busy_strategy(),
        prefs in prefs_strategy(),
    ) {
        let request = PlanningRequest::new(tasks, now())
            .with_busy(busy)
            .with_preferences(prefs);
        let first = generate_plan(&request).unwrap();
        let second = generate_plan(&request.clone()).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        prop_assert_eq!(first, second);
    }
}

#[test]
fn single_weighted_task_is_spread_out() {
    let request = PlanningRequest::new(
        vec![Task::new("essay", "Essay").with_due_date(day(10)).with_weight(30.0)],
        now(),
    )
    .with_preferences(evening_prefs());
    let plan = generate_plan(&request).unwrap();

    assert!(plan.infeasible_tasks.is_empty());
    assert!(plan.summary.total_hours >= 1.0 && plan.summary.total_hours < 10.0);
    assert!(plan.summary.days_covered >= 2);

    let dates: Vec<_> = plan.days.iter().map(|d| d.date).collect();
    for pair in dates.windows(2) {
        assert!((pair[1] - pair[0]).num_days() >= 2, "sessions on adjacent days");
    }
    let last = plan.sessions.last().unwrap();
    assert!(last.date <= today() + Duration::days(9));
    assert!(last.reason.contains("final review"));
    assert_eq!(last.session_index, last.session_count);
}

#[test]
fn relaxed_spacing_keeps_sessions_full_length() {
    let prefs = Preferences {
        spacing_days: 2,
        buffer_days: 0,
        busy_buffer_minutes: 0,
        ..evening_prefs()
    };
    let request = PlanningRequest::new(
        vec![Task::new("essay", "Essay")
            .with_due_date(day(3))
            .with_weight(30.0)
            .with_effort_hours(4.5)],
        now(),
    )
    .with_preferences(prefs);
    let plan = generate_plan(&request).unwrap();
    check_guarantees(&request, &plan).unwrap();

    let minutes: Vec<_> = plan.sessions.iter().map(|s| s.duration_minutes).collect();
    assert_eq!(minutes, vec![120, 60, 90]);
    assert!(plan.sessions[1].reason.contains("spacing relaxed"));
    assert!(plan.sessions[2].reason.contains("final review"));
}

#[test]
fn lower_priority_task_takes_the_shortfall() {
    let prefs = Preferences {
        spacing_days: 1,
        buffer_days: 0,
        busy_buffer_minutes: 0,
        ..evening_prefs()
    };
    let request = PlanningRequest::new(
        vec![
            Task::new("major", "Major exam")
                .with_due_date(day(2))
                .with_weight(40.0)
                .with_effort_hours(4.0),
            Task::new("minor", "Minor quiz")
                .with_due_date(day(2))
                .with_weight(10.0)
                .with_effort_hours(4.0),
        ],
        now(),
    )
    .with_preferences(prefs);
    let plan = generate_plan(&request).unwrap();

    assert_eq!(plan.infeasible_tasks.len(), 1);
    let short = &plan.infeasible_tasks[0];
    assert_eq!(short.task_id, "minor");
    assert!(short.shortfall_hours > 0.0);

    let major: i64 = plan.sessions_for_task("major").map(|s| s.duration_minutes).sum();
    assert_eq!(major, 240);
    assert!(plan.task_budgets[0].priority_score > plan.task_budgets[1].priority_score);
    assert!(plan.warnings.iter().any(|w| w.contains("Minor quiz")));
}

#[test]
fn fully_booked_day_is_skipped() {
    let booked = BusyInterval::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 2, 23, 0, 0).unwrap(),
        "shift",
    );
    let request = PlanningRequest::new(
        vec![Task::new("lab", "Lab report").with_due_date(day(7)).with_effort_hours(2.0)],
        now(),
    )
    .with_busy(vec![booked])
    .with_preferences(evening_prefs());
    let plan = generate_plan(&request).unwrap();

    assert!(plan.day(today()).is_none());
    assert_eq!(plan.sessions[0].date, today() + Duration::days(1));
    assert_eq!(plan.summary.total_hours, 2.0);
}

#[test]
fn todays_sessions_start_after_now() {
    let late = Utc.with_ymd_and_hms(2026, 3, 2, 19, 20, 0).unwrap();
    let request = PlanningRequest::new(
        vec![Task::new("read", "Reading").with_due_date(day(5)).with_effort_hours(1.0)],
        late,
    )
    .with_preferences(evening_prefs());
    let plan = generate_plan(&request).unwrap();

    let first = &plan.sessions[0];
    assert_eq!(first.date, today());
    assert!(first.start >= late);
    assert_eq!(plan.generated_at, late);
}

#[test]
fn empty_input_gives_empty_plan() {
    let plan = generate_plan(&PlanningRequest::new(Vec::new(), now())).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.summary.total_hours, 0.0);
    assert_eq!(plan.summary.tasks_scheduled, 0);
    assert_eq!(plan.summary.busiest_day, None);
    assert!(plan.render_text().contains("No study sessions scheduled."));
}

#[test]
fn fully_booked_calendar_reports_every_task() {
    let start = today().and_hms_opt(0, 0, 0).unwrap().and_utc();
    let wall = BusyInterval::new(start, start + Duration::days(30), "trip");
    let request = PlanningRequest::new(
        vec![
            Task::new("a", "A").with_due_date(day(5)),
            Task::new("b", "B"),
        ],
        now(),
    )
    .with_busy(vec![wall]);
    let plan = generate_plan(&request).unwrap();

    assert!(plan.is_empty());
    assert_eq!(plan.infeasible_tasks.len(), 2);
    assert_eq!(plan.availability.total_free_hours, 0.0);
}

#[test]
fn malformed_tasks_are_skipped_not_fatal() {
    let request = PlanningRequest::new(
        vec![
            Task::new("past", "Past").with_due_date(day(-1)),
            Task::new("neg", "Negative").with_weight(-10.0),
            Task::new("fine", "Fine").with_due_date(day(4)).with_effort_hours(1.0),
        ],
        now(),
    );
    let plan = generate_plan(&request).unwrap();

    let skipped: Vec<_> = plan.skipped_tasks.iter().map(|s| s.task_id.as_str()).collect();
    assert_eq!(skipped, vec!["past", "neg"]);
    assert_eq!(plan.summary.tasks_scheduled, 1);
    assert!(plan.render_text().contains("Skipped:"));
}

#[test]
fn topics_share_the_task_budget() {
    let mut task = Task::new("exam", "Exam").with_due_date(day(10)).with_weight(30.0);
    task.topics = vec![
        studyplan_core::SubTopic {
            name: "Limits".into(),
            importance: 1.0,
        },
        studyplan_core::SubTopic {
            name: "Integrals".into(),
            importance: 2.0,
        },
    ];
    let plan = generate_plan(&PlanningRequest::new(vec![task], now())).unwrap();

    let topics = &plan.task_budgets[0].topics;
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].hours, 2.0);
    assert_eq!(topics[1].hours, 4.0);
}
