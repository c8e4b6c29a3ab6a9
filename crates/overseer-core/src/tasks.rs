//! Task repository: creation, completion submission and review.
//!
//! Tasks are created active and owned jointly by one supervisor and one
//! assignee. Completions snapshot the task's point value at submission so
//! later edits never retroactively change a pending review. Reviews are
//! check-then-set against the completion's current status: a second
//! concurrent review observes the updated status and fails with
//! `AlreadyReviewed` instead of double-applying point effects.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CoreError, DatabaseError, Result};
use crate::ledger;
use crate::model::{
    AutoPunishment, CompletionStatus, Frequency, RecurrenceRule, Task, TaskCompletion,
};
use crate::recurrence;
use crate::storage::database::{
    self, auto_punishment_to_db, format_completion_status, format_datetime, format_frequency,
    format_time, format_weekdays, COMPLETION_COLS, TASK_COLS,
};
use crate::storage::{ids, Database};
use crate::users;

/// Input for task creation.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub supervisor_id: i64,
    pub assignee_id: i64,
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
    pub point_value: i64,
    pub deadline: Option<DateTime<Utc>>,
    pub recurrence: RecurrenceRule,
    pub anchor_time: Option<NaiveTime>,
    pub auto_punishment: AutoPunishment,
    pub reminder_hours: Option<i64>,
}

/// Result of reviewing a completion.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub status: CompletionStatus,
    /// Points credited to the assignee (0 on rejection). Doubled when the
    /// task had already been deactivated by deadline expiry, refunding the
    /// automatic deduction.
    pub points_awarded: i64,
    pub new_balance: Option<i64>,
    /// Deadline recomputed from the task's anchor time, when one is set.
    pub new_deadline: Option<DateTime<Utc>>,
    /// Whether the review brought an expired task back to active.
    pub reactivated: bool,
}

/// Repository for tasks and their completions.
pub struct TaskRepo {
    db: Arc<Database>,
}

impl TaskRepo {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a task. The supervisor must be linked to the assignee.
    ///
    /// When recurrence is enabled, `next_occurrence` is computed eagerly in
    /// the assignee's timezone.
    pub fn create(&self, new: NewTask) -> Result<Task> {
        validate_rule(&new.recurrence)?;
        self.db.with_tx(|conn| {
            if !users::is_linked(conn, new.supervisor_id, new.assignee_id)? {
                return Err(CoreError::Unauthorized {
                    actor: new.supervisor_id,
                    action: format!("assign tasks to unlinked user {}", new.assignee_id),
                });
            }

            let next_occurrence = if new.recurrence.enabled {
                let tz = users::timezone_of(conn, new.assignee_id);
                let local_now = Utc::now().with_timezone(&tz);
                Some(recurrence::next_occurrence(&new.recurrence, local_now).with_timezone(&Utc))
            } else {
                None
            };

            let id = ids::first_free_id(conn, "tasks").map_err(DatabaseError::from)?;
            conn.execute(
                "INSERT INTO tasks (id, supervisor_id, assignee_id, title, description,
                     frequency, point_value, deadline, recurrence_enabled, interval_hours,
                     weekdays, time_of_day, next_occurrence, anchor_time, auto_punishment_id,
                     active, reminder_hours, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 1, ?16, ?17)",
                params![
                    id,
                    new.supervisor_id,
                    new.assignee_id,
                    new.title,
                    new.description,
                    format_frequency(new.frequency),
                    new.point_value,
                    new.deadline.map(format_datetime),
                    new.recurrence.enabled,
                    new.recurrence.interval_hours,
                    new.recurrence.weekdays.as_deref().map(format_weekdays),
                    new.recurrence.time_of_day.map(format_time),
                    next_occurrence.map(format_datetime),
                    new.anchor_time.map(format_time),
                    auto_punishment_to_db(new.auto_punishment),
                    new.reminder_hours,
                    format_datetime(Utc::now()),
                ],
            )
            .map_err(DatabaseError::from)?;
            get_task(conn, id)
        })
    }

    pub fn get(&self, task_id: i64) -> Result<Task> {
        self.db.with_conn(|conn| get_task(conn, task_id))
    }

    /// Tasks assigned to an assignee, optionally restricted to active ones.
    pub fn list_for_assignee(&self, assignee_id: i64, active_only: bool) -> Result<Vec<Task>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {TASK_COLS} FROM tasks
                 WHERE assignee_id = ?1 {}
                 ORDER BY id",
                if active_only { "AND active = 1" } else { "" }
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![assignee_id], database::row_to_task)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// Tasks created by a supervisor.
    pub fn list_for_supervisor(&self, supervisor_id: i64, active_only: bool) -> Result<Vec<Task>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {TASK_COLS} FROM tasks
                 WHERE supervisor_id = ?1 {}
                 ORDER BY id",
                if active_only { "AND active = 1" } else { "" }
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![supervisor_id], database::row_to_task)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// Change a task's point value. Pending completions keep their snapshot.
    pub fn set_point_value(&self, supervisor_id: i64, task_id: i64, value: i64) -> Result<()> {
        self.db.with_conn(|conn| {
            let task = get_task(conn, task_id)?;
            if task.supervisor_id != supervisor_id {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("modify task {task_id}"),
                });
            }
            conn.execute(
                "UPDATE tasks SET point_value = ?1 WHERE id = ?2",
                params![value, task_id],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
    }

    /// Delete a task and its completions. Owning supervisor only.
    pub fn delete(&self, supervisor_id: i64, task_id: i64) -> Result<()> {
        self.db.with_tx(|conn| {
            let task = get_task(conn, task_id)?;
            if task.supervisor_id != supervisor_id {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("delete task {task_id}"),
                });
            }
            conn.execute(
                "DELETE FROM task_completions WHERE task_id = ?1",
                params![task_id],
            )
            .map_err(DatabaseError::from)?;
            conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])
                .map_err(DatabaseError::from)?;
            Ok(())
        })
    }

    /// Submit a completion for review.
    ///
    /// Fails with `NotFound` if the task is missing or inactive. The task's
    /// current point value is snapshotted into the completion. Submitting
    /// while a pending completion exists returns that pending record
    /// unchanged, keeping one pending review per task.
    pub fn submit_completion(
        &self,
        task_id: i64,
        assignee_id: i64,
        proof_url: Option<&str>,
    ) -> Result<TaskCompletion> {
        self.db.with_tx(|conn| {
            let task = get_task(conn, task_id)?;
            if !task.active {
                return Err(CoreError::NotFound {
                    entity: "task",
                    id: task_id,
                });
            }
            if task.assignee_id != assignee_id {
                return Err(CoreError::Unauthorized {
                    actor: assignee_id,
                    action: format!("complete task {task_id}"),
                });
            }
            if let Some(pending) = pending_completion_for_task(conn, task_id)? {
                return Ok(pending);
            }

            let id = ids::first_free_id(conn, "task_completions").map_err(DatabaseError::from)?;
            conn.execute(
                "INSERT INTO task_completions (id, task_id, assignee_id, proof_url,
                     points_snapshot, status, submitted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
                params![
                    id,
                    task_id,
                    assignee_id,
                    proof_url,
                    task.point_value,
                    format_datetime(Utc::now()),
                ],
            )
            .map_err(DatabaseError::from)?;
            get_completion(conn, id)
        })
    }

    /// Review a pending completion.
    ///
    /// Approval credits the snapshotted points -- doubled when the task was
    /// already deactivated by deadline expiry, refunding the automatic
    /// deduction. Approval, and rejection with `reset_deadline_on_reject`,
    /// recompute the deadline from the task's anchor time (in the
    /// assignee's timezone) and reactivate the task. A plain rejection
    /// leaves the deadline untouched so the assignee can resubmit against
    /// it.
    pub fn review_completion(
        &self,
        completion_id: i64,
        reviewer_id: i64,
        approved: bool,
        reset_deadline_on_reject: bool,
    ) -> Result<ReviewOutcome> {
        self.db.with_tx(|conn| {
            let completion = get_completion(conn, completion_id)?;
            if completion.status.is_terminal() {
                return Err(CoreError::AlreadyReviewed {
                    entity: "completion",
                    id: completion_id,
                    status: format_completion_status(completion.status).to_string(),
                });
            }
            let task = get_task(conn, completion.task_id)?;
            if task.supervisor_id != reviewer_id {
                return Err(CoreError::Unauthorized {
                    actor: reviewer_id,
                    action: format!("review completion {completion_id}"),
                });
            }

            let now = Utc::now();
            let status = if approved {
                CompletionStatus::Approved
            } else {
                CompletionStatus::Rejected
            };
            conn.execute(
                "UPDATE task_completions
                 SET status = ?1, reviewed_by = ?2, reviewed_at = ?3
                 WHERE id = ?4",
                params![
                    format_completion_status(status),
                    reviewer_id,
                    format_datetime(now),
                    completion_id,
                ],
            )
            .map_err(DatabaseError::from)?;

            let mut outcome = ReviewOutcome {
                status,
                points_awarded: 0,
                new_balance: None,
                new_deadline: None,
                reactivated: false,
            };

            if approved {
                // An expired task already cost the assignee its point value;
                // a late approval pays it back on top of the award.
                let award = if task.active {
                    completion.points_snapshot
                } else {
                    completion.points_snapshot * 2
                };
                outcome.points_awarded = award;
                outcome.new_balance = Some(ledger::apply_delta(conn, task.assignee_id, award)?);
            }

            let reset_deadline = approved || reset_deadline_on_reject;
            if let (true, Some(anchor)) = (reset_deadline, task.anchor_time) {
                let tz = users::timezone_of(conn, task.assignee_id);
                let deadline = recurrence::anchor_deadline(anchor, tz, now);
                conn.execute(
                    "UPDATE tasks SET deadline = ?1, active = 1 WHERE id = ?2",
                    params![format_datetime(deadline), task.id],
                )
                .map_err(DatabaseError::from)?;
                outcome.new_deadline = Some(deadline);
                outcome.reactivated = !task.active;
            }

            Ok(outcome)
        })
    }

    /// Pending completions awaiting review by a supervisor, oldest first.
    pub fn pending_completions(&self, supervisor_id: i64) -> Result<Vec<TaskCompletion>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM task_completions tc
                 JOIN tasks t ON tc.task_id = t.id
                 WHERE t.supervisor_id = ?1 AND tc.status = 'pending'
                 ORDER BY tc.submitted_at",
                database::qualify(COMPLETION_COLS, "tc")
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![supervisor_id], database::row_to_completion)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    pub fn get_completion(&self, completion_id: i64) -> Result<TaskCompletion> {
        self.db.with_conn(|conn| get_completion(conn, completion_id))
    }

    /// Discard any pending completion and recompute the next occurrence.
    ///
    /// A stale submission is voided by the reset, never silently approved.
    pub fn reset_recurring(&self, task_id: i64) -> Result<Task> {
        self.db.with_tx(|conn| {
            let task = get_task(conn, task_id)?;
            reset_recurring_conn(conn, &task, Utc::now())?;
            get_task(conn, task_id)
        })
    }
}

fn validate_rule(rule: &RecurrenceRule) -> Result<()> {
    if !rule.enabled {
        return Ok(());
    }
    if rule.interval_hours.is_some() && rule.weekdays.is_some() {
        return Err(CoreError::InvalidRecurrenceRule(
            "interval and weekday set are mutually exclusive".to_string(),
        ));
    }
    if let Some(hours) = rule.interval_hours {
        if hours <= 0 {
            return Err(CoreError::InvalidRecurrenceRule(format!(
                "interval must be positive, got {hours}"
            )));
        }
    }
    if let Some(days) = &rule.weekdays {
        if days.is_empty() {
            return Err(CoreError::InvalidRecurrenceRule(
                "empty weekday set".to_string(),
            ));
        }
    }
    Ok(())
}

pub(crate) fn get_task(conn: &Connection, task_id: i64) -> Result<Task> {
    let sql = format!("SELECT {TASK_COLS} FROM tasks WHERE id = ?1");
    conn.query_row(&sql, params![task_id], database::row_to_task)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound {
                entity: "task",
                id: task_id,
            },
            other => DatabaseError::from(other).into(),
        })
}

pub(crate) fn get_completion(conn: &Connection, completion_id: i64) -> Result<TaskCompletion> {
    let sql = format!("SELECT {COMPLETION_COLS} FROM task_completions WHERE id = ?1");
    conn.query_row(&sql, params![completion_id], database::row_to_completion)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound {
                entity: "completion",
                id: completion_id,
            },
            other => DatabaseError::from(other).into(),
        })
}

pub(crate) fn pending_completion_for_task(
    conn: &Connection,
    task_id: i64,
) -> Result<Option<TaskCompletion>> {
    let sql = format!(
        "SELECT {COMPLETION_COLS} FROM task_completions
         WHERE task_id = ?1 AND status = 'pending'
         ORDER BY submitted_at
         LIMIT 1"
    );
    conn.query_row(&sql, params![task_id], database::row_to_completion)
        .optional()
        .map_err(|e| DatabaseError::from(e).into())
}

/// Active tasks whose deadline has passed with no approved completion since
/// the task was created.
pub(crate) fn expired_tasks(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Task>> {
    let sql = format!(
        "SELECT {TASK_COLS} FROM tasks
         WHERE active = 1
           AND deadline IS NOT NULL
           AND deadline < ?1
           AND NOT EXISTS (
               SELECT 1 FROM task_completions tc
               WHERE tc.task_id = tasks.id
                 AND tc.status = 'approved'
                 AND tc.reviewed_at >= tasks.created_at
           )
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
    let rows = stmt
        .query_map(params![format_datetime(now)], database::row_to_task)
        .map_err(DatabaseError::from)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| DatabaseError::from(e).into())
}

/// Recurring tasks whose next occurrence has passed.
pub(crate) fn recurring_due(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Task>> {
    let sql = format!(
        "SELECT {TASK_COLS} FROM tasks
         WHERE recurrence_enabled = 1
           AND next_occurrence IS NOT NULL
           AND next_occurrence < ?1
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
    let rows = stmt
        .query_map(params![format_datetime(now)], database::row_to_task)
        .map_err(DatabaseError::from)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| DatabaseError::from(e).into())
}

/// Void any pending completion and recompute `next_occurrence` from `now`
/// in the assignee's timezone.
pub(crate) fn reset_recurring_conn(
    conn: &Connection,
    task: &Task,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    if !task.recurrence.enabled {
        return Ok(None);
    }
    conn.execute(
        "DELETE FROM task_completions WHERE task_id = ?1 AND status = 'pending'",
        params![task.id],
    )
    .map_err(DatabaseError::from)?;

    let tz = users::timezone_of(conn, task.assignee_id);
    let next =
        recurrence::next_occurrence(&task.recurrence, now.with_timezone(&tz)).with_timezone(&Utc);
    conn.execute(
        "UPDATE tasks SET next_occurrence = ?1 WHERE id = ?2",
        params![format_datetime(next), task.id],
    )
    .map_err(DatabaseError::from)?;
    Ok(Some(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::users::UserRepo;
    use chrono::Duration;

    fn setup() -> (Arc<Database>, TaskRepo) {
        let db = Arc::new(Database::open_memory().unwrap());
        let users = UserRepo::new(db.clone());
        users.register(1, "dom", Role::Supervisor).unwrap();
        users.register(2, "sub", Role::Assignee).unwrap();
        users.link(1, 2).unwrap();
        (db.clone(), TaskRepo::new(db))
    }

    fn new_task() -> NewTask {
        NewTask {
            supervisor_id: 1,
            assignee_id: 2,
            title: "Dishes".to_string(),
            description: "Before bed".to_string(),
            frequency: Frequency::Daily,
            point_value: 10,
            deadline: Some(Utc::now() + Duration::hours(12)),
            recurrence: RecurrenceRule::default(),
            anchor_time: None,
            auto_punishment: AutoPunishment::None,
            reminder_hours: None,
        }
    }

    fn deactivate(db: &Arc<Database>, task_id: i64) {
        db.with_conn(|conn| {
            conn.execute("UPDATE tasks SET active = 0 WHERE id = ?1", params![task_id])
                .map_err(DatabaseError::from)?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn create_requires_relationship() {
        let (_db, tasks) = setup();
        let mut unlinked = new_task();
        unlinked.assignee_id = 99;
        assert!(matches!(
            tasks.create(unlinked),
            Err(CoreError::Unauthorized { actor: 1, .. })
        ));
    }

    #[test]
    fn create_computes_next_occurrence_eagerly() {
        let (_db, tasks) = setup();
        let mut recurring = new_task();
        recurring.recurrence = RecurrenceRule {
            enabled: true,
            interval_hours: Some(24),
            weekdays: None,
            time_of_day: None,
        };
        let task = tasks.create(recurring).unwrap();
        let next = task.next_occurrence.unwrap();
        let expected = Utc::now() + Duration::hours(24);
        assert!((next - expected).num_seconds().abs() < 5);
    }

    #[test]
    fn invalid_rules_are_rejected() {
        let (_db, tasks) = setup();
        let mut bad = new_task();
        bad.recurrence = RecurrenceRule {
            enabled: true,
            interval_hours: Some(0),
            weekdays: None,
            time_of_day: None,
        };
        assert!(matches!(
            tasks.create(bad),
            Err(CoreError::InvalidRecurrenceRule(_))
        ));
    }

    #[test]
    fn submission_snapshots_point_value() {
        let (_db, tasks) = setup();
        let task = tasks.create(new_task()).unwrap();
        let completion = tasks.submit_completion(task.id, 2, Some("http://img/1")).unwrap();
        assert_eq!(completion.points_snapshot, 10);

        // Editing the task afterwards must not change the pending snapshot.
        tasks.set_point_value(1, task.id, 50).unwrap();
        let outcome = tasks.review_completion(completion.id, 1, true, false).unwrap();
        assert_eq!(outcome.points_awarded, 10);
        assert_eq!(outcome.new_balance, Some(10));
    }

    #[test]
    fn submission_to_inactive_task_is_not_found() {
        let (db, tasks) = setup();
        let task = tasks.create(new_task()).unwrap();
        deactivate(&db, task.id);
        assert!(matches!(
            tasks.submit_completion(task.id, 2, None),
            Err(CoreError::NotFound { entity: "task", .. })
        ));
    }

    #[test]
    fn resubmission_returns_existing_pending() {
        let (_db, tasks) = setup();
        let task = tasks.create(new_task()).unwrap();
        let first = tasks.submit_completion(task.id, 2, Some("a")).unwrap();
        let second = tasks.submit_completion(task.id, 2, Some("b")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.proof_url.as_deref(), Some("a"));
    }

    #[test]
    fn double_review_is_rejected_and_pays_once() {
        let (db, tasks) = setup();
        let task = tasks.create(new_task()).unwrap();
        let completion = tasks.submit_completion(task.id, 2, None).unwrap();

        let outcome = tasks.review_completion(completion.id, 1, true, false).unwrap();
        assert_eq!(outcome.new_balance, Some(10));

        assert!(matches!(
            tasks.review_completion(completion.id, 1, true, false),
            Err(CoreError::AlreadyReviewed { .. })
        ));
        let ledger = crate::ledger::Ledger::new(db);
        assert_eq!(ledger.balance(2).unwrap(), 10);
    }

    #[test]
    fn review_requires_ownership() {
        let (db, tasks) = setup();
        let users = UserRepo::new(db.clone());
        users.register(3, "other", Role::Supervisor).unwrap();
        let task = tasks.create(new_task()).unwrap();
        let completion = tasks.submit_completion(task.id, 2, None).unwrap();
        assert!(matches!(
            tasks.review_completion(completion.id, 3, true, false),
            Err(CoreError::Unauthorized { actor: 3, .. })
        ));
    }

    #[test]
    fn late_approval_after_expiry_awards_double_and_reactivates() {
        let (db, tasks) = setup();
        let mut anchored = new_task();
        anchored.anchor_time = NaiveTime::from_hms_opt(9, 0, 0);
        let task = tasks.create(anchored).unwrap();
        let completion = tasks.submit_completion(task.id, 2, None).unwrap();

        // Deadline sweep deactivated the task before review.
        deactivate(&db, task.id);

        let outcome = tasks.review_completion(completion.id, 1, true, false).unwrap();
        assert_eq!(outcome.points_awarded, 20);
        assert!(outcome.reactivated);
        assert!(outcome.new_deadline.is_some());
        assert!(tasks.get(task.id).unwrap().active);
    }

    #[test]
    fn plain_rejection_keeps_deadline() {
        let (_db, tasks) = setup();
        let mut anchored = new_task();
        anchored.anchor_time = NaiveTime::from_hms_opt(9, 0, 0);
        let task = tasks.create(anchored).unwrap();
        let before = tasks.get(task.id).unwrap().deadline;

        let completion = tasks.submit_completion(task.id, 2, None).unwrap();
        let outcome = tasks.review_completion(completion.id, 1, false, false).unwrap();
        assert_eq!(outcome.points_awarded, 0);
        assert!(outcome.new_deadline.is_none());
        assert_eq!(tasks.get(task.id).unwrap().deadline, before);
    }

    #[test]
    fn reset_rejection_recomputes_deadline() {
        let (_db, tasks) = setup();
        let mut anchored = new_task();
        anchored.anchor_time = NaiveTime::from_hms_opt(9, 0, 0);
        let task = tasks.create(anchored).unwrap();
        let completion = tasks.submit_completion(task.id, 2, None).unwrap();

        let outcome = tasks.review_completion(completion.id, 1, false, true).unwrap();
        let deadline = outcome.new_deadline.unwrap();
        assert!(deadline > Utc::now());
        assert_eq!(tasks.get(task.id).unwrap().deadline, Some(deadline));
    }

    #[test]
    fn reset_recurring_voids_pending_and_advances() {
        let (_db, tasks) = setup();
        let mut recurring = new_task();
        recurring.recurrence = RecurrenceRule {
            enabled: true,
            interval_hours: Some(24),
            weekdays: None,
            time_of_day: None,
        };
        let task = tasks.create(recurring).unwrap();
        let completion = tasks.submit_completion(task.id, 2, None).unwrap();

        let reset = tasks.reset_recurring(task.id).unwrap();
        let expected = Utc::now() + Duration::hours(24);
        assert!((reset.next_occurrence.unwrap() - expected).num_seconds().abs() < 5);
        assert!(matches!(
            tasks.get_completion(completion.id),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_cascades_and_checks_ownership() {
        let (db, tasks) = setup();
        let users = UserRepo::new(db.clone());
        users.register(3, "other", Role::Supervisor).unwrap();

        let task = tasks.create(new_task()).unwrap();
        let completion = tasks.submit_completion(task.id, 2, None).unwrap();

        assert!(matches!(
            tasks.delete(3, task.id),
            Err(CoreError::Unauthorized { actor: 3, .. })
        ));
        tasks.delete(1, task.id).unwrap();
        assert!(matches!(
            tasks.get(task.id),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            tasks.get_completion(completion.id),
            Err(CoreError::NotFound { .. })
        ));
    }
}
