//! Deadline sweep and reminder loop commands.

use chrono::Utc;
use clap::Subcommand;
use overseer_core::{DeadlineSweeper, Notifier, ReminderScheduler};

use super::{context, CliResult};

#[derive(Subcommand)]
pub enum SweepAction {
    /// Run one sweep cycle immediately
    Once,
    /// Run the periodic sweeper and reminder scheduler until interrupted
    Run,
}

pub async fn run(action: SweepAction) -> CliResult {
    let ctx = context()?;
    let sweeper = DeadlineSweeper::new(
        ctx.db.clone(),
        ctx.notifier.clone(),
        ctx.config.sweep.clone(),
    );

    match action {
        SweepAction::Once => {
            let report = sweeper.sweep_once(Utc::now()).await;
            let summary = format!(
                "Sweep: {} expired tasks, {} expired assignments, {} recurring resets, \
                 {} cascades, {} threshold firings, {} failures",
                report.expired_tasks,
                report.expired_assignments,
                report.recurring_resets,
                report.cascades,
                report.threshold_firings,
                report.failures
            );
            println!("{summary}");
            if let Some(channel) = ctx.config.notifications.channel.as_deref() {
                if let Err(e) = ctx.notifier.post_channel(channel, &summary).await {
                    eprintln!("Warning: failed to post sweep summary: {e}");
                }
            }
        }
        SweepAction::Run => {
            let reminders = ReminderScheduler::new(
                ctx.db.clone(),
                ctx.notifier.clone(),
                ctx.config.reminders.clone(),
            );
            println!(
                "Sweeping every {}s, reminders every {}s. Ctrl-C to stop.",
                ctx.config.sweep.period_secs, ctx.config.reminders.period_secs
            );
            tokio::join!(sweeper.run(), reminders.run());
        }
    }
    Ok(())
}
