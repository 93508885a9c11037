//! Effort estimation: grade weight and horizon to a study-hour budget.
//!
//! The budget grows linearly with weight and logarithmically with the
//! days remaining. Horizons beyond the dampening threshold shrink the
//! budget again, and two ceilings (absolute and weight-proportional)
//! bound the result. Budgets are rounded to quarter hours.

use serde::{Deserialize, Serialize};

/// Weight assumed for tasks that do not state their share of the grade.
pub const NEUTRAL_WEIGHT: f64 = 10.0;

/// Tuning knobs for the effort curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortConfig {
    /// Base hours before any weight is applied
    pub base_hours: f64,
    /// Extra hours per grade-weight percentage point
    pub hours_per_weight_point: f64,
    /// Horizon multiplier at zero days remaining
    pub horizon_offset: f64,
    /// Horizon multiplier slope per ln(1 + days)
    pub horizon_log_slope: f64,
    /// Horizons longer than this are dampened
    pub dampening_after_days: f64,
    /// Smallest budget ever returned
    pub floor_hours: f64,
    /// Largest budget ever returned
    pub absolute_ceiling_hours: f64,
    /// Ceiling as hours per weight point
    pub weight_ceiling_ratio: f64,
}

impl Default for EffortConfig {
    fn default() -> Self {
        Self {
            base_hours: 1.0,
            hours_per_weight_point: 0.15,
            horizon_offset: 0.5,
            horizon_log_slope: 0.25,
            dampening_after_days: 30.0,
            floor_hours: 1.0,
            absolute_ceiling_hours: 40.0,
            weight_ceiling_ratio: 0.8,
        }
    }
}

/// A sub-topic with the collaborator-supplied importance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTopic {
    pub name: String,
    #[serde(default = "default_importance")]
    pub importance: f64,
}

fn default_importance() -> f64 {
    1.0
}

/// Share of a task budget assigned to one sub-topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAllocation {
    pub name: String,
    pub hours: f64,
}

/// Estimator for task study-hour budgets.
pub struct EffortEstimator {
    config: EffortConfig,
}

impl EffortEstimator {
    /// Create an estimator with the default curve
    pub fn new() -> Self {
        Self {
            config: EffortConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: EffortConfig) -> Self {
        Self { config }
    }

    /// Estimate the total hour budget for one logical task.
    ///
    /// # Arguments
    /// * `weight` - Percentage of the final grade; [`NEUTRAL_WEIGHT`] when absent
    /// * `days_remaining` - Whole days until the due date (negative is treated as 0)
    pub fn estimate(&self, weight: Option<f64>, days_remaining: i64) -> f64 {
        let cfg = &self.config;
        let weight = weight.unwrap_or(NEUTRAL_WEIGHT).clamp(0.0, 100.0);
        let days = days_remaining.max(0) as f64;

        let weight_hours = cfg.base_hours + cfg.hours_per_weight_point * weight;
        let horizon_factor = cfg.horizon_offset + cfg.horizon_log_slope * (1.0 + days).ln();
        let dampening = if days > cfg.dampening_after_days {
            (cfg.dampening_after_days / days).sqrt()
        } else {
            1.0
        };

        let ceiling = (cfg.weight_ceiling_ratio * weight)
            .max(cfg.floor_hours)
            .min(cfg.absolute_ceiling_hours);

        let raw = weight_hours * horizon_factor * dampening;
        round_quarter(raw.max(cfg.floor_hours).min(ceiling))
    }

    /// Split a task's total budget across its sub-topics.
    ///
    /// Shares are proportional to importance and are handed out in quarter
    /// hours by largest remainder, so the allocations always sum to the
    /// (quarter-rounded) total. Non-positive importances get nothing unless
    /// every topic is non-positive, in which case the split is even.
    pub fn distribute(&self, total_hours: f64, topics: &[SubTopic]) -> Vec<TopicAllocation> {
        if topics.is_empty() {
            return Vec::new();
        }

        let units = (total_hours.max(0.0) * 4.0).round() as i64;
        let mut weights: Vec<f64> = topics
            .iter()
            .map(|t| {
                if t.importance.is_finite() && t.importance > 0.0 {
                    t.importance
                } else {
                    0.0
                }
            })
            .collect();
        if weights.iter().all(|w| *w == 0.0) {
            weights.iter_mut().for_each(|w| *w = 1.0);
        }
        let weight_sum: f64 = weights.iter().sum();

        let exact: Vec<f64> = weights
            .iter()
            .map(|w| units as f64 * w / weight_sum)
            .collect();
        let mut shares: Vec<i64> = exact.iter().map(|e| e.floor() as i64).collect();
        let mut leftover = units - shares.iter().sum::<i64>();

        let mut order: Vec<usize> = (0..topics.len()).collect();
        order.sort_by(|&a, &b| {
            let ra = exact[a] - exact[a].floor();
            let rb = exact[b] - exact[b].floor();
            rb.total_cmp(&ra).then(a.cmp(&b))
        });
        for idx in order {
            if leftover <= 0 {
                break;
            }
            if weights[idx] > 0.0 {
                shares[idx] += 1;
                leftover -= 1;
            }
        }

        topics
            .iter()
            .zip(shares)
            .map(|(topic, share)| TopicAllocation {
                name: topic.name.clone(),
                hours: share as f64 / 4.0,
            })
            .collect()
    }
}

impl Default for EffortEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to estimate with the default curve
pub fn estimate_effort_hours(weight: Option<f64>, days_remaining: i64) -> f64 {
    EffortEstimator::new().estimate(weight, days_remaining)
}

fn round_quarter(hours: f64) -> f64 {
    (hours * 4.0).round() / 4.0
}
