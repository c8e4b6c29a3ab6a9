//! Punishment catalog and assignment commands.

use chrono::{Duration, Utc};
use clap::Subcommand;
use overseer_core::{notify, AutoPunishment, NewPunishmentAssignment, PunishmentRepo, UserRepo};

use super::{context, CliResult};

#[derive(Subcommand)]
pub enum PunishmentAction {
    /// Create a catalog punishment
    Create {
        supervisor: i64,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List a supervisor's punishments
    List {
        supervisor: i64,
    },
    /// Assign a punishment to an assignee
    Assign {
        supervisor: i64,
        assignee: i64,
        /// Catalog id, or "random" to draw from the catalog
        #[arg(long, default_value = "random")]
        punishment: String,
        #[arg(long)]
        reason: Option<String>,
        /// Hours until the proof deadline
        #[arg(long, default_value_t = 24)]
        deadline_hours: i64,
        /// Point penalty if the deadline is missed (doubled on expiry)
        #[arg(long, default_value_t = 10)]
        penalty: i64,
        /// Identity that receives the proof upon approval
        #[arg(long)]
        forward_to: Option<String>,
        /// Remind every N hours until the deadline
        #[arg(long)]
        remind_hours: Option<i64>,
    },
    /// Submit proof for an assignment
    Submit {
        assignment: i64,
        assignee: i64,
        proof: String,
    },
    /// Review a submitted proof
    Review {
        assignment: i64,
        supervisor: i64,
        #[arg(value_parser = ["approve", "reject"])]
        verdict: String,
    },
    /// Force-approve an assignment ("cancel")
    Cancel {
        assignment: i64,
        supervisor: i64,
    },
    /// List an assignee's open assignments
    Open {
        assignee: i64,
        /// Include approved/rejected assignments
        #[arg(long)]
        all: bool,
    },
    /// List proofs awaiting review
    Queue {
        supervisor: i64,
    },
    /// Delete a catalog punishment and its assignments
    Delete {
        supervisor: i64,
        punishment: i64,
    },
}

pub async fn run(action: PunishmentAction) -> CliResult {
    let ctx = context()?;
    let punishments = PunishmentRepo::new(ctx.db.clone());

    match action {
        PunishmentAction::Create {
            supervisor,
            title,
            description,
        } => {
            let punishment = punishments.create(supervisor, &title, &description)?;
            println!("Created punishment #{} \"{}\"", punishment.id, punishment.title);
        }
        PunishmentAction::List { supervisor } => {
            let list = punishments.list(supervisor)?;
            if list.is_empty() {
                println!("No punishments.");
            }
            for punishment in list {
                println!("#{} {} {}", punishment.id, punishment.title, punishment.description);
            }
        }
        PunishmentAction::Assign {
            supervisor,
            assignee,
            punishment,
            reason,
            deadline_hours,
            penalty,
            forward_to,
            remind_hours,
        } => {
            let punishment = match punishment.as_str() {
                "random" => AutoPunishment::Random,
                id => AutoPunishment::Specific(id.parse()?),
            };
            let assignment = punishments.assign(NewPunishmentAssignment {
                supervisor_id: supervisor,
                assignee_id: assignee,
                punishment,
                reason,
                deadline: Utc::now() + Duration::hours(deadline_hours.max(1)),
                penalty,
                forward_to,
                reminder_hours: remind_hours,
            })?;
            println!(
                "Assignment #{} (punishment #{}) due {}",
                assignment.id,
                assignment.item_id,
                assignment
                    .deadline
                    .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_default()
            );

            let assignee_user = UserRepo::new(ctx.db).get(assignee)?;
            notify::deliver(
                ctx.notifier.as_ref(),
                &assignee_user.username,
                &format!("Punishment assignment #{} issued", assignment.id),
            )
            .await;
        }
        PunishmentAction::Submit {
            assignment,
            assignee,
            proof,
        } => {
            punishments.submit_proof(assignment, assignee, &proof)?;
            println!("Proof submitted for assignment #{assignment}");
        }
        PunishmentAction::Review {
            assignment,
            supervisor,
            verdict,
        } => {
            let approved = verdict == "approve";
            let outcome = punishments.review_proof(assignment, supervisor, approved)?;
            println!("Assignment #{assignment}: {:?}", outcome.status);
            if outcome.refunded > 0 {
                println!(
                    "Refunded {} points (balance now {})",
                    outcome.refunded,
                    outcome.new_balance.unwrap_or_default()
                );
            }
            if let Some(release) = outcome.forward {
                notify::deliver(
                    ctx.notifier.as_ref(),
                    &release.to,
                    &format!(
                        "Proof for assignment #{}: {}",
                        release.assignment_id,
                        release.proof_url.as_deref().unwrap_or("none")
                    ),
                )
                .await;
            }
        }
        PunishmentAction::Cancel {
            assignment,
            supervisor,
        } => {
            let outcome = punishments.cancel(assignment, supervisor)?;
            println!("Assignment #{assignment} cancelled (approved)");
            if outcome.refunded > 0 {
                println!("Refunded {} points", outcome.refunded);
            }
            if let Some(release) = outcome.forward {
                notify::deliver(
                    ctx.notifier.as_ref(),
                    &release.to,
                    &format!(
                        "Proof for assignment #{}: {}",
                        release.assignment_id,
                        release.proof_url.as_deref().unwrap_or("none")
                    ),
                )
                .await;
            }
        }
        PunishmentAction::Open { assignee, all } => {
            let list = punishments.list_for_assignee(assignee, all)?;
            if list.is_empty() {
                println!("No assignments.");
            }
            for assignment in list {
                println!(
                    "#{} punishment #{} [{:?}] penalty {} due {}",
                    assignment.id,
                    assignment.item_id,
                    assignment.status,
                    assignment.penalty.unwrap_or(0),
                    assignment
                        .deadline
                        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
                        .unwrap_or_else(|| "never".to_string()),
                );
            }
        }
        PunishmentAction::Queue { supervisor } => {
            let list = punishments.submitted_proofs(supervisor)?;
            if list.is_empty() {
                println!("Nothing awaiting review.");
            }
            for assignment in list {
                println!(
                    "#{} proof: {}",
                    assignment.id,
                    assignment.proof_url.as_deref().unwrap_or("none")
                );
            }
        }
        PunishmentAction::Delete {
            supervisor,
            punishment,
        } => {
            punishments.delete(supervisor, punishment)?;
            println!("Deleted punishment #{punishment}");
        }
    }
    Ok(())
}
