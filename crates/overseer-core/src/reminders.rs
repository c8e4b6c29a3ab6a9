//! Reminder scheduler.
//!
//! Periodic process that emits due reminders for open obligations. It
//! never mutates lifecycle state; stamping `last_reminded_at` is the only
//! write, pure bookkeeping so one reminder interval elapses between
//! emissions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use tokio::time::MissedTickBehavior;

use crate::error::{DatabaseError, Result};
use crate::notify::{self, Notifier};
use crate::storage::config::ReminderConfig;
use crate::storage::database::{format_datetime, parse_datetime, parse_datetime_opt};
use crate::storage::Database;

/// Counts from one reminder cycle.
#[derive(Debug, Clone, Default)]
pub struct ReminderReport {
    pub task_reminders: usize,
    pub assignment_reminders: usize,
    pub failures: usize,
}

struct DueReminder {
    id: i64,
    username: String,
    message: String,
}

/// Periodic reminder emission over the shared store.
pub struct ReminderScheduler {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    config: ReminderConfig,
}

impl ReminderScheduler {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn Notifier>, config: ReminderConfig) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    /// Run the reminder loop forever on a fixed period.
    pub async fn run(&self) {
        let period = std::time::Duration::from_secs(self.config.period_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let report = self.remind_once(Utc::now()).await;
            if report.failures > 0 {
                eprintln!(
                    "Warning: reminder cycle finished with {} failures",
                    report.failures
                );
            }
        }
    }

    /// One reminder cycle at `now`. Exposed for tests and the CLI.
    pub async fn remind_once(&self, now: DateTime<Utc>) -> ReminderReport {
        let mut report = ReminderReport::default();

        match self.due_task_reminders(now) {
            Ok(due) => {
                for reminder in due {
                    notify::deliver(self.notifier.as_ref(), &reminder.username, &reminder.message)
                        .await;
                    if let Err(e) = self.stamp_task(reminder.id, now) {
                        report.failures += 1;
                        eprintln!("Warning: failed to stamp task reminder {}: {e}", reminder.id);
                    } else {
                        report.task_reminders += 1;
                    }
                }
            }
            Err(e) => {
                report.failures += 1;
                eprintln!("Warning: task reminder scan failed: {e}");
            }
        }

        match self.due_assignment_reminders(now) {
            Ok(due) => {
                for reminder in due {
                    notify::deliver(self.notifier.as_ref(), &reminder.username, &reminder.message)
                        .await;
                    if let Err(e) = self.stamp_assignment(reminder.id, now) {
                        report.failures += 1;
                        eprintln!(
                            "Warning: failed to stamp assignment reminder {}: {e}",
                            reminder.id
                        );
                    } else {
                        report.assignment_reminders += 1;
                    }
                }
            }
            Err(e) => {
                report.failures += 1;
                eprintln!("Warning: assignment reminder scan failed: {e}");
            }
        }

        report
    }

    /// Active tasks with a reminder interval whose deadline is still ahead
    /// and whose last reminder (or creation) is at least one interval old.
    fn due_task_reminders(&self, now: DateTime<Utc>) -> Result<Vec<DueReminder>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT t.id, t.title, t.deadline, t.reminder_hours,
                            t.last_reminded_at, t.created_at, u.username
                     FROM tasks t
                     JOIN users u ON u.user_id = t.assignee_id
                     WHERE t.active = 1
                       AND t.reminder_hours IS NOT NULL
                       AND t.deadline IS NOT NULL
                       AND t.deadline > ?1
                     ORDER BY t.id",
                )
                .map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![format_datetime(now)], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })
                .map_err(DatabaseError::from)?;

            let mut due = Vec::new();
            for row in rows {
                let (id, title, deadline, hours, last, created, username) =
                    row.map_err(DatabaseError::from)?;
                let baseline = parse_datetime_opt(last).unwrap_or_else(|| parse_datetime(&created));
                if baseline + Duration::hours(hours) > now {
                    continue;
                }
                let deadline = parse_datetime(&deadline);
                due.push(DueReminder {
                    id,
                    username,
                    message: format!(
                        "Reminder: task #{id} \"{title}\" is due at {}",
                        deadline.format("%Y-%m-%d %H:%M UTC")
                    ),
                });
            }
            Ok(due)
        })
    }

    /// Pending punishment assignments with a reminder interval, same
    /// cadence rules as tasks.
    fn due_assignment_reminders(&self, now: DateTime<Utc>) -> Result<Vec<DueReminder>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT a.id, a.deadline, a.reminder_hours, a.last_reminded_at,
                            a.assigned_at, u.username, p.title
                     FROM assignments a
                     JOIN users u ON u.user_id = a.assignee_id
                     JOIN punishments p ON p.id = a.item_id
                     WHERE a.kind = 'punishment'
                       AND a.status = 'pending'
                       AND a.reminder_hours IS NOT NULL
                       AND a.deadline IS NOT NULL
                       AND a.deadline > ?1
                     ORDER BY a.id",
                )
                .map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![format_datetime(now)], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                })
                .map_err(DatabaseError::from)?;

            let mut due = Vec::new();
            for row in rows {
                let (id, deadline, hours, last, assigned, username, title) =
                    row.map_err(DatabaseError::from)?;
                let baseline =
                    parse_datetime_opt(last).unwrap_or_else(|| parse_datetime(&assigned));
                if baseline + Duration::hours(hours) > now {
                    continue;
                }
                let deadline = parse_datetime(&deadline);
                due.push(DueReminder {
                    id,
                    username,
                    message: format!(
                        "Reminder: punishment \"{title}\" (assignment #{id}) is due at {}",
                        deadline.format("%Y-%m-%d %H:%M UTC")
                    ),
                });
            }
            Ok(due)
        })
    }

    fn stamp_task(&self, task_id: i64, now: DateTime<Utc>) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET last_reminded_at = ?1 WHERE id = ?2",
                params![format_datetime(now), task_id],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
    }

    fn stamp_assignment(&self, assignment_id: i64, now: DateTime<Utc>) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE assignments SET last_reminded_at = ?1 WHERE id = ?2",
                params![format_datetime(now), assignment_id],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutoPunishment, Frequency, RecurrenceRule, Role};
    use crate::notify::NotifyError;
    use crate::punishments::{NewPunishmentAssignment, PunishmentRepo};
    use crate::tasks::{NewTask, TaskRepo};
    use crate::users::UserRepo;
    use std::sync::Mutex;

    struct RecordingNotifier(Mutex<Vec<(String, String)>>);

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_user(&self, identity: &str, message: &str) -> Result<(), NotifyError> {
            self.0
                .lock()
                .unwrap()
                .push((identity.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn setup() -> (Arc<Database>, Arc<RecordingNotifier>, ReminderScheduler) {
        let db = Arc::new(Database::open_memory().unwrap());
        let users = UserRepo::new(db.clone());
        users.register(1, "dom", Role::Supervisor).unwrap();
        users.register(2, "sub", Role::Assignee).unwrap();
        users.link(1, 2).unwrap();
        let recorder = Arc::new(RecordingNotifier(Mutex::new(Vec::new())));
        let scheduler =
            ReminderScheduler::new(db.clone(), recorder.clone(), ReminderConfig::default());
        (db, recorder, scheduler)
    }

    fn reminder_task(hours: i64) -> NewTask {
        NewTask {
            supervisor_id: 1,
            assignee_id: 2,
            title: "Dishes".to_string(),
            description: String::new(),
            frequency: Frequency::Daily,
            point_value: 10,
            deadline: Some(Utc::now() + Duration::hours(12)),
            recurrence: RecurrenceRule::default(),
            anchor_time: None,
            auto_punishment: AutoPunishment::None,
            reminder_hours: Some(hours),
        }
    }

    fn backdate_task_creation(db: &Arc<Database>, task_id: i64, hours: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET created_at = ?1 WHERE id = ?2",
                params![format_datetime(Utc::now() - Duration::hours(hours)), task_id],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
        .unwrap();
    }

    #[tokio::test]
    async fn reminds_after_interval_and_stamps() {
        let (db, recorder, scheduler) = setup();
        let tasks = TaskRepo::new(db.clone());
        let task = tasks.create(reminder_task(4)).unwrap();
        backdate_task_creation(&db, task.id, 5);

        let report = scheduler.remind_once(Utc::now()).await;
        assert_eq!(report.task_reminders, 1);
        let sent = recorder.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "sub");
        assert!(sent[0].1.contains("Dishes"));
        drop(sent);

        // Within the same interval nothing further is emitted.
        let report = scheduler.remind_once(Utc::now()).await;
        assert_eq!(report.task_reminders, 0);
    }

    #[tokio::test]
    async fn fresh_tasks_are_quiet() {
        let (db, recorder, scheduler) = setup();
        TaskRepo::new(db).create(reminder_task(4)).unwrap();

        let report = scheduler.remind_once(Utc::now()).await;
        assert_eq!(report.task_reminders, 0);
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reminders_stop_at_the_deadline() {
        let (db, _recorder, scheduler) = setup();
        let tasks = TaskRepo::new(db.clone());
        let mut past_due = reminder_task(1);
        past_due.deadline = Some(Utc::now() - Duration::hours(1));
        let task = tasks.create(past_due).unwrap();
        backdate_task_creation(&db, task.id, 5);

        let report = scheduler.remind_once(Utc::now()).await;
        assert_eq!(report.task_reminders, 0);
    }

    #[tokio::test]
    async fn pending_assignments_get_reminders() {
        let (db, recorder, scheduler) = setup();
        let punishments = PunishmentRepo::new(db.clone());
        let p = punishments.create(1, "Lines", "").unwrap();
        let assignment = punishments
            .assign(NewPunishmentAssignment {
                supervisor_id: 1,
                assignee_id: 2,
                punishment: AutoPunishment::Specific(p.id),
                reason: None,
                deadline: Utc::now() + Duration::hours(20),
                penalty: 10,
                forward_to: None,
                reminder_hours: Some(2),
            })
            .unwrap();

        db.with_conn(|conn| {
            conn.execute(
                "UPDATE assignments SET assigned_at = ?1 WHERE id = ?2",
                params![
                    format_datetime(Utc::now() - Duration::hours(3)),
                    assignment.id
                ],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
        .unwrap();

        let report = scheduler.remind_once(Utc::now()).await;
        assert_eq!(report.assignment_reminders, 1);
        assert!(recorder.0.lock().unwrap()[0].1.contains("Lines"));
    }
}
