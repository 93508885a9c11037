//! Plain-text rendering of a plan.

use std::fmt::Write;

use super::Plan;

pub(super) fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let s = &plan.summary;

    let _ = writeln!(
        out,
        "Study plan: {:.2}h across {} day(s), {} task(s) scheduled",
        s.total_hours, s.days_covered, s.tasks_scheduled
    );
    if let Some(busiest) = s.busiest_day {
        let _ = writeln!(
            out,
            "Average {:.2}h/day, busiest {} ({:.2}h)",
            s.average_hours_per_day, busiest, s.busiest_day_hours
        );
    }
    let _ = writeln!(out, "Availability: {}", plan.availability.message);

    if plan.is_empty() {
        let _ = writeln!(out, "\nNo study sessions scheduled.");
    }

    for day in &plan.days {
        let _ = writeln!(out, "\n{} {} ({:.2}h)", day.day_name, day.date, day.total_hours);
        for session in &day.sessions {
            let _ = writeln!(
                out,
                "  {}-{}  {} ({}m) - {}",
                session.start.format("%H:%M"),
                session.end.format("%H:%M"),
                session.task_title,
                session.duration_minutes,
                session.reason
            );
        }
    }

    if !plan.infeasible_tasks.is_empty() {
        let _ = writeln!(out, "\nCould not fully schedule:");
        for task in &plan.infeasible_tasks {
            let _ = writeln!(
                out,
                "  {}: {:.2}h short ({})",
                task.title, task.shortfall_hours, task.reason
            );
        }
    }

    if !plan.skipped_tasks.is_empty() {
        let _ = writeln!(out, "\nSkipped:");
        for task in &plan.skipped_tasks {
            let _ = writeln!(out, "  {}: {}", task.title, task.reason);
        }
    }

    for warning in &plan.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }

    out
}
