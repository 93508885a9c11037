//! Calendar-side analysis and task ranking.
//!
//! This module provides:
//! - Free-slot detection inside the preferred study window
//! - Priority scoring and deterministic ranking of tasks
//! - Availability analysis over the planning horizon

mod availability;
mod gap;
mod priority;

pub use availability::{analyze_availability, AvailabilityReport, DayAvailability, Feasibility};
pub use gap::{BusyInterval, FreeSlot, FreeSlotCalculator};
pub use priority::{PriorityScorer, PriorityWeights, RankedTask};

/// Minutes to hours, rounded to two decimals for presentation.
pub fn minutes_to_hours(minutes: i64) -> f64 {
    round2(minutes as f64 / 60.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
