//! Free-slot detection inside the preferred daily study window.
//!
//! Busy intervals are widened by the configured buffer, clipped to the
//! window, merged, and the window minus that set is returned as the list
//! of free slots. Fragments shorter than the minimum session are dropped.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::preferences::ResolvedPreferences;

/// A pre-existing commitment from the calendar collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub label: String,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// `start < end`
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Check if this interval, widened by `buffer`, overlaps `[start, end)`
    pub fn overlaps_with_buffer(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        buffer: Duration,
    ) -> bool {
        self.start - buffer < end && self.end + buffer > start
    }
}

/// A contiguous span of study time on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeSlot {
    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes() as f64 / 60.0
    }
}

/// Calculator for free slots within a daily window.
pub struct FreeSlotCalculator {
    window_start: NaiveTime,
    window_end: NaiveTime,
    buffer_minutes: i64,
    min_slot_minutes: i64,
}

impl FreeSlotCalculator {
    /// Create a calculator for the given window, with no buffer and no minimum
    pub fn new(window_start: NaiveTime, window_end: NaiveTime) -> Self {
        Self {
            window_start,
            window_end,
            buffer_minutes: 0,
            min_slot_minutes: 0,
        }
    }

    /// Create from resolved preferences (window, busy buffer, minimum session)
    pub fn from_preferences(prefs: &ResolvedPreferences) -> Self {
        Self::new(prefs.window_start, prefs.window_end)
            .with_buffer(prefs.busy_buffer_minutes)
            .with_min_slot(prefs.min_session_minutes)
    }

    /// Set the margin added on both sides of busy intervals
    pub fn with_buffer(mut self, minutes: i64) -> Self {
        self.buffer_minutes = minutes.max(0);
        self
    }

    /// Set the shortest fragment worth keeping
    pub fn with_min_slot(mut self, minutes: i64) -> Self {
        self.min_slot_minutes = minutes.max(0);
        self
    }

    /// Find the free slots on `date`.
    ///
    /// # Arguments
    /// * `date` - Day to inspect
    /// * `busy` - Busy intervals; only those touching the window matter
    /// * `not_before` - Nothing may start before this instant (used for "today")
    ///
    /// # Returns
    /// Free slots sorted by start time
    pub fn free_slots(
        &self,
        date: NaiveDate,
        busy: &[BusyInterval],
        not_before: Option<DateTime<Utc>>,
    ) -> Vec<FreeSlot> {
        let day_start = date.and_time(self.window_start).and_utc();
        let day_end = date.and_time(self.window_end).and_utc();
        let buffer = Duration::minutes(self.buffer_minutes);

        let mut blocked: Vec<(DateTime<Utc>, DateTime<Utc>)> = busy
            .iter()
            .filter(|b| b.is_valid())
            .filter(|b| b.overlaps_with_buffer(day_start, day_end, buffer))
            .map(|b| {
                (
                    (b.start - buffer).max(day_start),
                    (b.end + buffer).min(day_end),
                )
            })
            .collect();

        if let Some(cutoff) = not_before {
            if cutoff > day_start {
                blocked.push((day_start, cutoff.min(day_end)));
            }
        }

        let merged = merge_intervals(blocked);

        let mut slots = Vec::new();
        let mut cursor = day_start;
        for (start, end) in merged {
            if start > cursor {
                self.push_slot(&mut slots, date, cursor, start);
            }
            cursor = cursor.max(end);
        }
        if cursor < day_end {
            self.push_slot(&mut slots, date, cursor, day_end);
        }

        slots
    }

    /// Free slots for `days` consecutive dates starting at `first`.
    pub fn free_slots_for_range(
        &self,
        first: NaiveDate,
        days: i64,
        busy: &[BusyInterval],
        not_before: Option<DateTime<Utc>>,
    ) -> BTreeMap<NaiveDate, Vec<FreeSlot>> {
        (0..days.max(0))
            .map(|offset| {
                let date = first + Duration::days(offset);
                (date, self.free_slots(date, busy, not_before))
            })
            .collect()
    }

    fn push_slot(
        &self,
        slots: &mut Vec<FreeSlot>,
        date: NaiveDate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        let slot = FreeSlot { date, start, end };
        if slot.duration_minutes() > 0 && slot.duration_minutes() >= self.min_slot_minutes {
            slots.push(slot);
        }
    }
}

/// Sort and merge overlapping or touching intervals.
fn merge_intervals(
    mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    intervals.retain(|(start, end)| start < end);
    intervals.sort();

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}
