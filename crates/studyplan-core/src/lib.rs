//! # Studyplan Core Library
//!
//! Deterministic study-session scheduling. Given weighted, dated academic
//! tasks, a busy calendar and study preferences, the engine produces a
//! conflict-free day-by-day plan of study sessions.
//!
//! ## Architecture
//!
//! - **Effort estimation**: grade weight and horizon to an hour budget
//! - **Timeline**: free-slot detection, priority ranking and availability analysis
//! - **Scheduler**: greedy session placement with spacing and deadline relaxation
//! - **Plan**: grouping into days, aggregate statistics and feedback
//! - **Storage**: TOML-based preference configuration
//!
//! ## Key Components
//!
//! - [`PlanningEngine`]: Runs the whole pipeline for one [`PlanningRequest`]
//! - [`SessionPlanner`]: Core greedy allocator
//! - [`Plan`]: The assembled result
//! - [`Config`]: Stored preferences
//!
//! The engine never reads the wall clock. The caller supplies `now`, and
//! identical requests always produce identical plans.

pub mod engine;
pub mod error;
pub mod plan;
pub mod preferences;
pub mod scheduler;
pub mod storage;
pub mod task;
pub mod timeline;

pub use engine::{generate_plan, PlanningEngine, PlanningInput, PlanningRequest};
pub use error::{ConfigError, CoreError, Result, ValidationError};
pub use plan::{DayPlan, Plan, PlanFeedback, PlanSummary, SkippedTask, TaskBudget, TimelineAssembler};
pub use preferences::{Preferences, ResolvedPreferences, MAX_PLANNING_DAYS};
pub use scheduler::{InfeasibleTask, SessionPlanner, StudySession};
pub use storage::Config;
pub use task::{EffortEstimator, SubTopic, Task, TaskCategory, TaskIssue, TopicAllocation};
pub use timeline::{
    AvailabilityReport, BusyInterval, Feasibility, FreeSlot, FreeSlotCalculator, PriorityScorer,
};
