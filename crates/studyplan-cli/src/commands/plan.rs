use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};
use studyplan_core::{
    Config, DayPlan, PlanFeedback, PlanningEngine, PlanningInput, PlanningRequest,
};

#[derive(Args)]
pub struct InputArgs {
    /// Planning input JSON file ({"tasks": [...], "busy": [...], "preferences": {...}})
    input: PathBuf,
    /// Reference time (RFC 3339); defaults to the current time
    #[arg(long)]
    now: Option<String>,
}

#[derive(Subcommand)]
pub enum PlanAction {
    /// Generate a study plan
    Generate {
        #[command(flatten)]
        input: InputArgs,
        /// Print a human-readable plan instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Show the sessions planned for one date
    Day {
        #[command(flatten)]
        input: InputArgs,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        #[arg(long)]
        text: bool,
    },
    /// Analyze free time over the planning horizon
    Availability {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Apply feedback and regenerate the plan
    Feedback {
        #[command(flatten)]
        input: InputArgs,
        /// Feedback JSON: a single action object or an array of them
        feedback: String,
        #[arg(long)]
        text: bool,
    },
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match now {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .map_err(|e| format!("invalid --now '{raw}': {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn load_request(args: &InputArgs) -> Result<PlanningRequest, Box<dyn std::error::Error>> {
    let input = read_input(&args.input)?;
    tracing::debug!(
        path = %args.input.display(),
        tasks = input.tasks.len(),
        busy = input.busy.len(),
        embedded_preferences = input.preferences.is_some(),
        "loaded planning input"
    );
    let fallback = Config::load()?.preferences;
    Ok(input.into_request(fallback, parse_now(args.now.as_deref())?))
}

fn read_input(path: &Path) -> Result<PlanningInput, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn parse_feedback(raw: &str) -> Result<Vec<PlanFeedback>, Box<dyn std::error::Error>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = PlanningEngine::new();
    match action {
        PlanAction::Generate { input, text } => {
            let plan = engine.generate(&load_request(&input)?)?;
            if text {
                print!("{}", plan.render_text());
            } else {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
        }
        PlanAction::Day { input, date, text } => {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| format!("invalid --date '{date}': {e}"))?;
            let plan = engine.generate(&load_request(&input)?)?;
            let day = plan.day(date).cloned().unwrap_or_else(|| DayPlan {
                date,
                day_name: date.format("%A").to_string(),
                total_minutes: 0,
                total_hours: 0.0,
                sessions: Vec::new(),
            });
            if text {
                println!("{} {} ({:.2}h)", day.day_name, day.date, day.total_hours);
                if day.sessions.is_empty() {
                    println!("  nothing scheduled");
                }
                for session in &day.sessions {
                    println!(
                        "  {}-{}  {} - {}",
                        session.start.format("%H:%M"),
                        session.end.format("%H:%M"),
                        session.task_title,
                        session.reason
                    );
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&day)?);
            }
        }
        PlanAction::Availability { input } => {
            let report = engine.availability(&load_request(&input)?)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        PlanAction::Feedback {
            input,
            feedback,
            text,
        } => {
            let mut request = load_request(&input)?;
            for item in parse_feedback(&feedback)? {
                request = item.apply(&request)?;
            }
            let plan = engine.generate(&request)?;
            if text {
                print!("{}", plan.render_text());
            } else {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
        }
    }
    Ok(())
}
