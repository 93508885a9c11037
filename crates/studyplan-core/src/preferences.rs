//! Study preferences consumed by the planning engine.
//!
//! Every field has a default so the engine can run with nothing but a
//! task list. Preferences are validated once per planning run and turned
//! into [`ResolvedPreferences`], which works in whole minutes.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest planning horizon, buffer or spacing accepted, in days.
pub const MAX_PLANNING_DAYS: u32 = 3650;

/// User study preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_max_hours_per_day")]
    pub max_hours_per_day: f64,
    /// Earliest study time, `HH:MM`
    #[serde(default = "default_preferred_start")]
    pub preferred_start: String,
    /// Latest study time, `HH:MM`
    #[serde(default = "default_preferred_end")]
    pub preferred_end: String,
    #[serde(default = "default_min_session_minutes")]
    pub min_session_minutes: u32,
    #[serde(default = "default_max_session_minutes")]
    pub max_session_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    /// Days kept free of new sessions right before a due date.
    #[serde(default = "default_buffer_days")]
    pub buffer_days: u32,
    /// Minimum number of days between two sessions of the same task.
    #[serde(default = "default_spacing_days")]
    pub spacing_days: u32,
    /// Margin added on both sides of every busy interval.
    #[serde(default = "default_busy_buffer_minutes")]
    pub busy_buffer_minutes: u32,
    /// Planning horizon for undated tasks, and the minimum horizon overall.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

fn default_max_hours_per_day() -> f64 {
    4.0
}
fn default_preferred_start() -> String {
    "17:00".into()
}
fn default_preferred_end() -> String {
    "22:00".into()
}
fn default_min_session_minutes() -> u32 {
    30
}
fn default_max_session_minutes() -> u32 {
    120
}
fn default_break_minutes() -> u32 {
    15
}
fn default_buffer_days() -> u32 {
    1
}
fn default_spacing_days() -> u32 {
    2
}
fn default_busy_buffer_minutes() -> u32 {
    10
}
fn default_horizon_days() -> u32 {
    14
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            max_hours_per_day: default_max_hours_per_day(),
            preferred_start: default_preferred_start(),
            preferred_end: default_preferred_end(),
            min_session_minutes: default_min_session_minutes(),
            max_session_minutes: default_max_session_minutes(),
            break_minutes: default_break_minutes(),
            buffer_days: default_buffer_days(),
            spacing_days: default_spacing_days(),
            busy_buffer_minutes: default_busy_buffer_minutes(),
            horizon_days: default_horizon_days(),
        }
    }
}

/// Preferences after validation, expressed in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPreferences {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub daily_cap_minutes: i64,
    pub min_session_minutes: i64,
    pub max_session_minutes: i64,
    pub break_minutes: i64,
    pub buffer_days: i64,
    pub spacing_days: i64,
    pub busy_buffer_minutes: i64,
    pub horizon_days: i64,
}

impl ResolvedPreferences {
    /// Length of the preferred daily window in minutes.
    pub fn window_minutes(&self) -> i64 {
        (self.window_end - self.window_start).num_minutes()
    }
}

/// Parse an `HH:MM` clock time.
pub fn parse_clock(field: &str, value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        ValidationError::invalid(field, format!("expected HH:MM, got '{value}'"))
    })
}

impl Preferences {
    /// Validate and convert to minute-based settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the window is empty or inverted,
    /// the session bounds are inconsistent, the daily cap is not positive,
    /// or a day count exceeds [`MAX_PLANNING_DAYS`].
    pub fn resolve(&self) -> Result<ResolvedPreferences, ValidationError> {
        let window_start = parse_clock("preferred_start", &self.preferred_start)?;
        let window_end = parse_clock("preferred_end", &self.preferred_end)?;
        if window_start >= window_end {
            return Err(ValidationError::InvalidTimeRange {
                start: self.preferred_start.clone(),
                end: self.preferred_end.clone(),
            });
        }

        if !self.max_hours_per_day.is_finite() || self.max_hours_per_day <= 0.0 {
            return Err(ValidationError::invalid(
                "max_hours_per_day",
                "must be a positive number of hours",
            ));
        }
        if self.min_session_minutes == 0 {
            return Err(ValidationError::invalid(
                "min_session_minutes",
                "must be at least 1 minute",
            ));
        }
        if self.min_session_minutes > self.max_session_minutes {
            return Err(ValidationError::invalid(
                "min_session_minutes",
                format!(
                    "{} exceeds max_session_minutes ({})",
                    self.min_session_minutes, self.max_session_minutes
                ),
            ));
        }
        if self.horizon_days == 0 {
            return Err(ValidationError::invalid("horizon_days", "must be at least 1"));
        }
        for (field, days) in [
            ("horizon_days", self.horizon_days),
            ("buffer_days", self.buffer_days),
            ("spacing_days", self.spacing_days),
        ] {
            if days > MAX_PLANNING_DAYS {
                return Err(ValidationError::invalid(
                    field,
                    format!("{days} exceeds the {MAX_PLANNING_DAYS}-day limit"),
                ));
            }
        }

        Ok(ResolvedPreferences {
            window_start,
            window_end,
            daily_cap_minutes: (self.max_hours_per_day * 60.0).round() as i64,
            min_session_minutes: i64::from(self.min_session_minutes),
            max_session_minutes: i64::from(self.max_session_minutes),
            break_minutes: i64::from(self.break_minutes),
            buffer_days: i64::from(self.buffer_days),
            spacing_days: i64::from(self.spacing_days),
            busy_buffer_minutes: i64::from(self.busy_buffer_minutes),
            horizon_days: i64::from(self.horizon_days),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let resolved = Preferences::default().resolve().unwrap();
        assert_eq!(resolved.window_minutes(), 300);
        assert_eq!(resolved.daily_cap_minutes, 240);
        assert_eq!(resolved.spacing_days, 2);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"max_hours_per_day": 3}"#).unwrap();
        assert_eq!(prefs.max_hours_per_day, 3.0);
        assert_eq!(prefs.preferred_start, "17:00");
        assert_eq!(prefs.buffer_days, 1);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let prefs = Preferences {
            preferred_start: "21:00".into(),
            preferred_end: "18:00".into(),
            ..Preferences::default()
        };
        assert!(matches!(
            prefs.resolve(),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn session_bounds_must_be_ordered() {
        let prefs = Preferences {
            min_session_minutes: 90,
            max_session_minutes: 60,
            ..Preferences::default()
        };
        assert!(prefs.resolve().is_err());
    }

    #[test]
    fn bad_clock_is_rejected() {
        assert!(parse_clock("preferred_start", "7pm").is_err());
        assert_eq!(
            parse_clock("preferred_start", "07:30").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
    }

    #[test]
    fn day_counts_are_bounded() {
        let prefs = Preferences {
            buffer_days: 200_000_000,
            ..Preferences::default()
        };
        let err = prefs.resolve().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "buffer_days"));

        let prefs = Preferences {
            horizon_days: MAX_PLANNING_DAYS + 1,
            ..Preferences::default()
        };
        assert!(prefs.resolve().is_err());

        let prefs = Preferences {
            horizon_days: MAX_PLANNING_DAYS,
            buffer_days: MAX_PLANNING_DAYS,
            ..Preferences::default()
        };
        assert!(prefs.resolve().is_ok());
    }

    #[test]
    fn zero_daily_cap_is_rejected() {
        let prefs = Preferences {
            max_hours_per_day: 0.0,
            ..Preferences::default()
        };
        assert!(prefs.resolve().is_err());
    }
}
