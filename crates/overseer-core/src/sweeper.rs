//! Deadline sweeper.
//!
//! Periodic process that discovers expired tasks and punishment
//! assignments and applies their expiry side effects. Each entity's side
//! effects run inside one transaction; a failure on one entity is logged
//! and never aborts the rest of the batch. A missed entity is picked up by
//! the next cycle.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::ledger;
use crate::model::{AssignmentKind, AssignmentStatus, Task};
use crate::notify::{self, Notifier};
use crate::punishments;
use crate::storage::config::SweepConfig;
use crate::storage::Database;
use crate::tasks;
use crate::thresholds;
use crate::users;

/// Counts from one sweep cycle.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub expired_tasks: usize,
    pub expired_assignments: usize,
    pub recurring_resets: usize,
    pub cascades: usize,
    pub threshold_firings: usize,
    pub failures: usize,
}

struct TaskExpiry {
    username: String,
    point_value: i64,
    new_balance: i64,
    cascade_assignment: Option<i64>,
    threshold_firings: usize,
}

struct AssignmentExpiry {
    username: String,
    penalty: i64,
    threshold_firings: usize,
}

/// Periodic deadline and recurrence sweep over the shared store.
pub struct DeadlineSweeper {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    config: SweepConfig,
}

impl DeadlineSweeper {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn Notifier>, config: SweepConfig) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    /// Run the sweep loop forever on a fixed period.
    pub async fn run(&self) {
        let period = std::time::Duration::from_secs(self.config.period_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let report = self.sweep_once(Utc::now()).await;
            if report.failures > 0 {
                eprintln!(
                    "Warning: sweep finished with {} per-entity failures",
                    report.failures
                );
            }
        }
    }

    /// One sweep cycle at `now`. Exposed for tests and the CLI.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        // Expired tasks: deduct, cascade, evaluate thresholds, deactivate.
        match self.db.with_conn(|conn| tasks::expired_tasks(conn, now)) {
            Ok(expired) => {
                for task in expired {
                    match self.expire_task(&task, now) {
                        Ok(Some(expiry)) => {
                            report.expired_tasks += 1;
                            report.threshold_firings += expiry.threshold_firings;
                            if expiry.cascade_assignment.is_some() {
                                report.cascades += 1;
                            }
                            self.notify_task_expiry(&task, &expiry).await;
                        }
                        Ok(None) => {} // already handled by a concurrent sweep
                        Err(e) => {
                            report.failures += 1;
                            eprintln!("Warning: failed to expire task {}: {e}", task.id);
                        }
                    }
                }
            }
            Err(e) => {
                report.failures += 1;
                eprintln!("Warning: expired-task scan failed: {e}");
            }
        }

        // Recurring tasks whose occurrence has passed: void stale pending
        // completions and recompute the next occurrence.
        match self.db.with_conn(|conn| tasks::recurring_due(conn, now)) {
            Ok(due) => {
                for task in due {
                    let reset = self
                        .db
                        .with_tx(|conn| tasks::reset_recurring_conn(conn, &task, now));
                    match reset {
                        Ok(Some(_)) => report.recurring_resets += 1,
                        Ok(None) => {}
                        Err(e) => {
                            report.failures += 1;
                            eprintln!("Warning: failed to reset task {}: {e}", task.id);
                        }
                    }
                }
            }
            Err(e) => {
                report.failures += 1;
                eprintln!("Warning: recurrence scan failed: {e}");
            }
        }

        // Punishment assignments still pending past the deadline: double
        // the penalty, deduct it, mark expired. Late proof stays possible.
        match self
            .db
            .with_conn(|conn| punishments::expired_assignments(conn, now))
        {
            Ok(expired) => {
                for assignment in expired {
                    match self.expire_assignment(assignment.id, now) {
                        Ok(Some(expiry)) => {
                            report.expired_assignments += 1;
                            report.threshold_firings += expiry.threshold_firings;
                            notify::deliver(
                                self.notifier.as_ref(),
                                &expiry.username,
                                &format!(
                                    "Punishment assignment #{} expired; penalty doubled to {}",
                                    assignment.id, expiry.penalty
                                ),
                            )
                            .await;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            report.failures += 1;
                            eprintln!(
                                "Warning: failed to expire assignment {}: {e}",
                                assignment.id
                            );
                        }
                    }
                }
            }
            Err(e) => {
                report.failures += 1;
                eprintln!("Warning: expired-assignment scan failed: {e}");
            }
        }

        report
    }

    /// Expiry side effects for one task, in one transaction.
    ///
    /// Re-checks the active flag inside the transaction so a concurrent
    /// sweep that already deactivated the task deducts nothing further.
    fn expire_task(&self, task: &Task, now: DateTime<Utc>) -> Result<Option<TaskExpiry>> {
        let cascade_penalty = self.config.cascade_penalty;
        let cascade_deadline = now + Duration::hours(self.config.cascade_deadline_hours);
        self.db.with_tx(|conn| {
            let current = tasks::get_task(conn, task.id)?;
            if !current.active {
                return Ok(None);
            }

            let user = users::get_user(conn, current.assignee_id)?;
            let new_balance = ledger::apply_delta(conn, current.assignee_id, -current.point_value)?;

            // Cascade penalty is fixed by configuration, independent of the
            // task's own point value.
            let cascade_assignment = match punishments::resolve_punishment(
                conn,
                current.supervisor_id,
                current.auto_punishment,
            )? {
                Some(item_id) => Some(punishments::insert_assignment(
                    conn,
                    AssignmentKind::Punishment,
                    item_id,
                    current.supervisor_id,
                    current.assignee_id,
                    Some(&format!("missed deadline on task #{}", current.id)),
                    Some(cascade_deadline),
                    Some(cascade_penalty),
                    None,
                    None,
                    AssignmentStatus::Pending,
                )?),
                None => None,
            };

            let firings =
                thresholds::check_thresholds(conn, current.assignee_id, new_balance, now)?;

            conn.execute(
                "UPDATE tasks SET active = 0 WHERE id = ?1",
                rusqlite::params![current.id],
            )
            .map_err(crate::error::DatabaseError::from)?;

            Ok(Some(TaskExpiry {
                username: user.username,
                point_value: current.point_value,
                new_balance,
                cascade_assignment,
                threshold_firings: firings.len(),
            }))
        })
    }

    /// Expiry side effects for one punishment assignment, in one
    /// transaction. Skips assignments a concurrent sweep already moved on.
    fn expire_assignment(
        &self,
        assignment_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<AssignmentExpiry>> {
        self.db.with_tx(|conn| {
            let current = punishments::get_assignment(conn, assignment_id)?;
            if current.status != AssignmentStatus::Pending {
                return Ok(None);
            }
            let user = users::get_user(conn, current.assignee_id)?;
            let new_balance = punishments::expire_assignment(conn, &current, now)?;
            let firings =
                thresholds::check_thresholds(conn, current.assignee_id, new_balance, now)?;
            Ok(Some(AssignmentExpiry {
                username: user.username,
                penalty: current.penalty.unwrap_or(0) * 2,
                threshold_firings: firings.len(),
            }))
        })
    }

    async fn notify_task_expiry(&self, task: &Task, expiry: &TaskExpiry) {
        let mut message = format!(
            "Task #{} \"{}\" expired: {} points deducted (balance {})",
            task.id, task.title, expiry.point_value, expiry.new_balance
        );
        if let Some(assignment_id) = expiry.cascade_assignment {
            message.push_str(&format!("; punishment assignment #{assignment_id} issued"));
        }
        notify::deliver(self.notifier.as_ref(), &expiry.username, &message).await;
    }
}
