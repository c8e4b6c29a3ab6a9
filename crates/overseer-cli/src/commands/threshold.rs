//! Point threshold rule commands.

use clap::Subcommand;
use overseer_core::{AutoPunishment, NewThreshold, ThresholdEvaluator};

use super::{context, CliResult};

#[derive(Subcommand)]
pub enum ThresholdAction {
    /// Create a threshold rule
    Create {
        supervisor: i64,
        /// Fire when the balance drops below this value
        points: i64,
        /// Catalog punishment id, or "random"
        #[arg(long, default_value = "random")]
        punishment: String,
        /// Restrict the rule to one assignee (all assignees when omitted)
        #[arg(long)]
        assignee: Option<i64>,
        /// Penalty on the spawned assignment
        #[arg(long, default_value_t = 10)]
        penalty: i64,
    },
    /// List a supervisor's rules
    List {
        supervisor: i64,
    },
    /// Delete a rule
    Delete {
        supervisor: i64,
        threshold: i64,
    },
}

pub async fn run(action: ThresholdAction) -> CliResult {
    let ctx = context()?;
    let thresholds = ThresholdEvaluator::new(ctx.db);

    match action {
        ThresholdAction::Create {
            supervisor,
            points,
            punishment,
            assignee,
            penalty,
        } => {
            let punishment = match punishment.as_str() {
                "random" => AutoPunishment::Random,
                id => AutoPunishment::Specific(id.parse()?),
            };
            let rule = thresholds.create(NewThreshold {
                supervisor_id: supervisor,
                assignee_id: assignee,
                threshold_points: points,
                punishment,
                penalty,
            })?;
            println!("Created threshold #{} (below {} points)", rule.id, rule.threshold_points);
        }
        ThresholdAction::List { supervisor } => {
            let rules = thresholds.list(supervisor)?;
            if rules.is_empty() {
                println!("No thresholds.");
            }
            for rule in rules {
                let scope = rule
                    .assignee_id
                    .map(|id| format!("assignee {id}"))
                    .unwrap_or_else(|| "all assignees".to_string());
                let last = rule
                    .last_triggered_at
                    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "#{} below {} points ({scope}, penalty {}, last fired {last})",
                    rule.id, rule.threshold_points, rule.penalty
                );
            }
        }
        ThresholdAction::Delete {
            supervisor,
            threshold,
        } => {
            thresholds.delete(supervisor, threshold)?;
            println!("Deleted threshold #{threshold}");
        }
    }
    Ok(())
}
