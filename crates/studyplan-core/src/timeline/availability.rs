//! Free-time availability analysis over the planning horizon.
//!
//! Summarizes the free slots before any session is placed: how much time
//! there is, which days are busiest, and whether the total effort budget
//! fits comfortably.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::gap::FreeSlot;
use super::{minutes_to_hours, round2};

/// How many busiest/best days are reported
const HIGHLIGHT_DAYS: usize = 3;
/// Share of the needed time that still counts as "tight" rather than "challenging"
const TIGHT_RATIO: f64 = 0.7;

/// Verdict on whether the budget fits the free time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feasibility {
    Comfortable,
    Tight,
    Challenging,
}

/// Free time on a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub day_name: String,
    pub free_hours: f64,
    /// Free time capped by the daily study limit
    pub usable_hours: f64,
    pub slot_count: usize,
}

/// Availability summary for the whole horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub days_analyzed: usize,
    pub total_free_hours: f64,
    pub total_usable_hours: f64,
    pub average_free_hours_per_day: f64,
    pub needed_hours: f64,
    pub recommended_hours_per_day: f64,
    pub feasibility: Feasibility,
    pub message: String,
    pub busiest_days: Vec<NaiveDate>,
    pub best_days: Vec<NaiveDate>,
    pub days: Vec<DayAvailability>,
}

/// Analyze free slots against the hours needed.
pub fn analyze_availability(
    slots: &BTreeMap<NaiveDate, Vec<FreeSlot>>,
    daily_cap_minutes: i64,
    needed_hours: f64,
) -> AvailabilityReport {
    let per_day: Vec<(NaiveDate, i64, i64, usize)> = slots
        .iter()
        .map(|(date, day_slots)| {
            let free: i64 = day_slots.iter().map(FreeSlot::duration_minutes).sum();
            (*date, free, free.min(daily_cap_minutes), day_slots.len())
        })
        .collect();

    let days_analyzed = per_day.len();
    let total_free: i64 = per_day.iter().map(|d| d.1).sum();
    let total_usable: i64 = per_day.iter().map(|d| d.2).sum();
    let usable_hours = total_usable as f64 / 60.0;

    let mut by_free = per_day.clone();
    by_free.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    let busiest_days = by_free.iter().take(HIGHLIGHT_DAYS).map(|d| d.0).collect();
    by_free.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let best_days = by_free.iter().take(HIGHLIGHT_DAYS).map(|d| d.0).collect();

    let day_count = days_analyzed.max(1) as f64;
    let even_split = needed_hours / day_count;
    let average_usable = usable_hours / day_count;

    let (feasibility, recommended, message) = if usable_hours >= needed_hours {
        (
            Feasibility::Comfortable,
            even_split,
            format!(
                "{:.1}h of study time available; {:.1}h/day covers the {:.1}h needed.",
                usable_hours, even_split, needed_hours
            ),
        )
    } else if usable_hours >= needed_hours * TIGHT_RATIO {
        (
            Feasibility::Tight,
            (average_usable * 0.8).min(even_split),
            format!(
                "{:.1}h available for {:.1}h needed; most free time will go to studying.",
                usable_hours, needed_hours
            ),
        )
    } else {
        (
            Feasibility::Challenging,
            average_usable * 0.9,
            format!(
                "Only {:.1}h available but {:.1}h needed; consider starting earlier or reducing scope.",
                usable_hours, needed_hours
            ),
        )
    };

    AvailabilityReport {
        days_analyzed,
        total_free_hours: minutes_to_hours(total_free),
        total_usable_hours: minutes_to_hours(total_usable),
        average_free_hours_per_day: round2(total_free as f64 / 60.0 / day_count),
        needed_hours: round2(needed_hours),
        recommended_hours_per_day: round2(recommended),
        feasibility,
        message,
        busiest_days,
        best_days,
        days: per_day
            .into_iter()
            .map(|(date, free, usable, slot_count)| DayAvailability {
                date,
                day_name: date.format("%A").to_string(),
                free_hours: minutes_to_hours(free),
                usable_hours: minutes_to_hours(usable),
                slot_count,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn slot(date: NaiveDate, start_h: u32, minutes: i64) -> FreeSlot {
        let start = date.and_hms_opt(start_h, 0, 0).unwrap().and_utc();
        FreeSlot {
            date,
            start,
            end: start + Duration::minutes(minutes),
        }
    }

    fn horizon() -> BTreeMap<NaiveDate, Vec<FreeSlot>> {
        let first = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        (0..4)
            .map(|i| {
                let date = first + Duration::days(i);
                let slots = if i == 1 {
                    Vec::new()
                } else {
                    vec![slot(date, 17, 60 * (i + 1))]
                };
                (date, slots)
            })
            .collect()
    }

    #[test]
    fn comfortable_when_time_exceeds_need() {
        let report = analyze_availability(&horizon(), 180, 4.0);
        assert_eq!(report.feasibility, Feasibility::Comfortable);
        assert_eq!(report.days_analyzed, 4);
        // 1h + 0 + 3h + 4h free, capped at 3h/day -> 7h usable
        assert_eq!(report.total_free_hours, 8.0);
        assert_eq!(report.total_usable_hours, 7.0);
        assert_eq!(report.recommended_hours_per_day, 1.0);
    }

    #[test]
    fn tight_and_challenging_thresholds() {
        assert_eq!(analyze_availability(&horizon(), 180, 9.0).feasibility, Feasibility::Tight);
        assert_eq!(
            analyze_availability(&horizon(), 180, 20.0).feasibility,
            Feasibility::Challenging
        );
    }

    #[test]
    fn busiest_and_best_days() {
        let report = analyze_availability(&horizon(), 600, 1.0);
        let first = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(report.busiest_days[0], first + Duration::days(1));
        assert_eq!(report.best_days[0], first + Duration::days(3));
        assert_eq!(report.busiest_days.len(), 3);
    }

    #[test]
    fn empty_horizon_is_challenging() {
        let report = analyze_availability(&BTreeMap::new(), 180, 2.0);
        assert_eq!(report.days_analyzed, 0);
        assert_eq!(report.feasibility, Feasibility::Challenging);
        assert_eq!(report.recommended_hours_per_day, 0.0);
    }
}
