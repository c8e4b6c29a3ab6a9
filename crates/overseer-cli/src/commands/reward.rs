//! Reward catalog and grant commands.

use clap::Subcommand;
use overseer_core::{notify, RewardRepo, UserRepo};

use super::{context, CliResult};

#[derive(Subcommand)]
pub enum RewardAction {
    /// Create a catalog reward
    Create {
        supervisor: i64,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Point cost deducted when granted
        #[arg(long, default_value_t = 0)]
        cost: i64,
    },
    /// List a supervisor's rewards
    List {
        supervisor: i64,
    },
    /// Grant a reward, deducting its cost
    Assign {
        supervisor: i64,
        assignee: i64,
        reward: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Delete a catalog reward
    Delete {
        supervisor: i64,
        reward: i64,
    },
}

pub async fn run(action: RewardAction) -> CliResult {
    let ctx = context()?;
    let rewards = RewardRepo::new(ctx.db.clone());

    match action {
        RewardAction::Create {
            supervisor,
            title,
            description,
            cost,
        } => {
            let reward = rewards.create(supervisor, &title, &description, cost)?;
            println!(
                "Created reward #{} \"{}\" ({} points)",
                reward.id, reward.title, reward.point_cost
            );
        }
        RewardAction::List { supervisor } => {
            let list = rewards.list(supervisor)?;
            if list.is_empty() {
                println!("No rewards.");
            }
            for reward in list {
                println!(
                    "#{} {} ({} points) {}",
                    reward.id, reward.title, reward.point_cost, reward.description
                );
            }
        }
        RewardAction::Assign {
            supervisor,
            assignee,
            reward,
            reason,
        } => {
            let grant = rewards.assign(supervisor, assignee, reward, reason.as_deref())?;
            println!(
                "Granted reward #{} to assignee {}; balance now {}",
                reward, assignee, grant.new_balance
            );
            if !grant.threshold_assignments.is_empty() {
                println!(
                    "Note: the deduction crossed {} threshold(s); punishment assignment(s) {:?} issued",
                    grant.threshold_assignments.len(),
                    grant.threshold_assignments
                );
            }

            let assignee_user = UserRepo::new(ctx.db).get(assignee)?;
            notify::deliver(
                ctx.notifier.as_ref(),
                &assignee_user.username,
                &format!("You received reward #{reward}"),
            )
            .await;
        }
        RewardAction::Delete { supervisor, reward } => {
            rewards.delete(supervisor, reward)?;
            println!("Deleted reward #{reward}");
        }
    }
    Ok(())
}
