use clap::Args;
use serde::Serialize;
use studyplan_core::task::{EffortEstimator, SubTopic, TopicAllocation};

#[derive(Args)]
pub struct EstimateArgs {
    /// Percentage of the final grade (0-100)
    #[arg(long)]
    weight: Option<f64>,
    /// Days until the due date
    #[arg(long)]
    days: i64,
    /// Sub-topics to split the budget across, as name=importance
    #[arg(long, num_args = 1.., value_parser = parse_topic)]
    topics: Vec<SubTopic>,
}

#[derive(Serialize)]
struct Estimate {
    weight: Option<f64>,
    days: i64,
    hours: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    topics: Vec<TopicAllocation>,
}

fn parse_topic(raw: &str) -> Result<SubTopic, String> {
    let (name, importance) = match raw.split_once('=') {
        Some((name, value)) => {
            let importance = value
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid importance '{value}': {e}"))?;
            (name.trim(), importance)
        }
        None => (raw.trim(), 1.0),
    };
    if name.is_empty() {
        return Err("topic name is empty".into());
    }
    Ok(SubTopic {
        name: name.to_string(),
        importance,
    })
}

pub fn run(args: EstimateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(weight) = args.weight {
        if !(0.0..=100.0).contains(&weight) {
            return Err(format!("weight {weight} is outside 0-100").into());
        }
    }

    let estimator = EffortEstimator::new();
    let hours = estimator.estimate(args.weight, args.days);
    let estimate = Estimate {
        weight: args.weight,
        days: args.days,
        hours,
        topics: estimator.distribute(hours, &args.topics),
    };
    println!("{}", serde_json::to_string_pretty(&estimate)?);
    Ok(())
}
