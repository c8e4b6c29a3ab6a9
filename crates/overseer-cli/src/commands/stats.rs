//! Points and statistics commands.

use clap::Subcommand;
use overseer_core::{Ledger, StatsRepo};

use super::{context, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Current point balance
    Points {
        user: i64,
    },
    /// Completion statistics over a day window
    Show {
        assignee: i64,
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

pub async fn run(action: StatsAction) -> CliResult {
    let ctx = context()?;

    match action {
        StatsAction::Points { user } => {
            let balance = Ledger::new(ctx.db).balance(user)?;
            println!("User {user}: {balance} points");
        }
        StatsAction::Show { assignee, days } => {
            let stats = StatsRepo::new(ctx.db).task_stats(assignee, days)?;
            println!(
                "Last {days} days: {} completions, {} points",
                stats.total_completions, stats.total_points
            );
            for bucket in stats.daily_counts {
                println!("  {}  {}", bucket.date, bucket.count);
            }
        }
    }
    Ok(())
}
