//! Task management commands.

use chrono::DateTime;
use clap::Subcommand;
use overseer_core::{
    notify, recurrence, AutoPunishment, Frequency, NewTask, RecurrenceRule, TaskRepo, UserRepo,
};

use super::{context, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task for an assignee
    Add {
        supervisor: i64,
        assignee: i64,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// daily, weekly or custom
        #[arg(long, default_value = "daily", value_parser = ["daily", "weekly", "custom"])]
        frequency: String,
        /// Points earned on approval (config default when omitted)
        #[arg(long)]
        points: Option<i64>,
        /// Absolute deadline, RFC 3339 (e.g. 2026-09-01T21:00:00Z)
        #[arg(long)]
        deadline: Option<String>,
        /// Recur every N hours
        #[arg(long)]
        every_hours: Option<i64>,
        /// Recur on weekdays, e.g. "mon,wed,fri"
        #[arg(long)]
        weekdays: Option<String>,
        /// Wall-clock time for weekday recurrence, HH:MM
        #[arg(long)]
        at: Option<String>,
        /// Anchor time used to recompute the deadline after review, HH:MM
        #[arg(long)]
        anchor: Option<String>,
        /// Punishment on missed deadline: a catalog id or "random"
        #[arg(long)]
        auto_punishment: Option<String>,
        /// Remind every N hours until the deadline
        #[arg(long)]
        remind_hours: Option<i64>,
    },
    /// List an assignee's tasks
    List {
        assignee: i64,
        /// Include inactive tasks
        #[arg(long)]
        all: bool,
    },
    /// Submit a completion for review
    Complete {
        task: i64,
        assignee: i64,
        /// Proof reference (e.g. image URL)
        #[arg(long)]
        proof: Option<String>,
    },
    /// Review a pending completion
    Review {
        completion: i64,
        supervisor: i64,
        #[arg(value_parser = ["approve", "reject"])]
        verdict: String,
        /// On rejection, recompute the deadline from the anchor time
        #[arg(long)]
        reset_deadline: bool,
    },
    /// List completions awaiting review
    Pending {
        supervisor: i64,
    },
    /// Change a task's point value
    SetPoints {
        supervisor: i64,
        task: i64,
        points: i64,
    },
    /// Delete a task and its completions
    Delete {
        supervisor: i64,
        task: i64,
    },
}

pub async fn run(action: TaskAction) -> CliResult {
    let ctx = context()?;
    let tasks = TaskRepo::new(ctx.db.clone());

    match action {
        TaskAction::Add {
            supervisor,
            assignee,
            title,
            description,
            frequency,
            points,
            deadline,
            every_hours,
            weekdays,
            at,
            anchor,
            auto_punishment,
            remind_hours,
        } => {
            let frequency = match frequency.as_str() {
                "daily" => Frequency::Daily,
                "weekly" => Frequency::Weekly,
                _ => Frequency::Custom,
            };
            let deadline = deadline
                .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&chrono::Utc)))
                .transpose()?;
            let weekdays = weekdays
                .map(|s| recurrence::parse_weekday_set(&s))
                .transpose()?;
            let time_of_day = at.map(|s| recurrence::parse_time_of_day(&s)).transpose()?;
            let anchor_time = anchor
                .map(|s| recurrence::parse_time_of_day(&s))
                .transpose()?;
            let auto_punishment = match auto_punishment.as_deref() {
                None => AutoPunishment::None,
                Some("random") => AutoPunishment::Random,
                Some(id) => AutoPunishment::Specific(id.parse()?),
            };
            let recurrence = RecurrenceRule {
                enabled: every_hours.is_some() || weekdays.is_some(),
                interval_hours: every_hours,
                weekdays,
                time_of_day,
            };

            let task = tasks.create(NewTask {
                supervisor_id: supervisor,
                assignee_id: assignee,
                title,
                description,
                frequency,
                point_value: points.unwrap_or(ctx.config.defaults.point_value),
                deadline,
                recurrence,
                anchor_time,
                auto_punishment,
                reminder_hours: remind_hours,
            })?;
            println!(
                "Created task #{} \"{}\" for assignee {} ({} points)",
                task.id, task.title, task.assignee_id, task.point_value
            );

            let assignee_user = UserRepo::new(ctx.db).get(assignee)?;
            notify::deliver(
                ctx.notifier.as_ref(),
                &assignee_user.username,
                &format!("New task #{}: {}", task.id, task.title),
            )
            .await;
        }
        TaskAction::List { assignee, all } => {
            let list = tasks.list_for_assignee(assignee, !all)?;
            if list.is_empty() {
                println!("No tasks.");
            }
            for task in list {
                let state = if task.active { "active" } else { "inactive" };
                let deadline = task
                    .deadline
                    .map(|d| d.format(" due %Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_default();
                println!(
                    "#{} [{}] {} ({} points){}",
                    task.id, state, task.title, task.point_value, deadline
                );
            }
        }
        TaskAction::Complete {
            task,
            assignee,
            proof,
        } => {
            let completion = tasks.submit_completion(task, assignee, proof.as_deref())?;
            println!(
                "Completion #{} submitted for task #{} ({} points pending review)",
                completion.id, completion.task_id, completion.points_snapshot
            );
        }
        TaskAction::Review {
            completion,
            supervisor,
            verdict,
            reset_deadline,
        } => {
            let approved = verdict == "approve";
            let outcome = tasks.review_completion(completion, supervisor, approved, reset_deadline)?;
            match outcome.new_balance {
                Some(balance) => println!(
                    "Approved: {} points awarded, balance now {}",
                    outcome.points_awarded, balance
                ),
                None => println!("Rejected."),
            }
            if let Some(deadline) = outcome.new_deadline {
                println!("Next deadline: {}", deadline.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        TaskAction::Pending { supervisor } => {
            let pending = tasks.pending_completions(supervisor)?;
            if pending.is_empty() {
                println!("Nothing awaiting review.");
            }
            for completion in pending {
                println!(
                    "Completion #{} for task #{} ({} points, proof: {})",
                    completion.id,
                    completion.task_id,
                    completion.points_snapshot,
                    completion.proof_url.as_deref().unwrap_or("none"),
                );
            }
        }
        TaskAction::SetPoints {
            supervisor,
            task,
            points,
        } => {
            tasks.set_point_value(supervisor, task, points)?;
            println!("Task #{task} now worth {points} points");
        }
        TaskAction::Delete { supervisor, task } => {
            tasks.delete(supervisor, task)?;
            println!("Deleted task #{task}");
        }
    }
    Ok(())
}
