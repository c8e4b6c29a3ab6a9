//! Completion statistics for reporting adapters.
//!
//! Read-only aggregates over approved completions. The daily buckets feed
//! external chart renderers as `{date, count}` pairs.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rusqlite::params;

use crate::error::{DatabaseError, Result};
use crate::model::{DailyCount, TaskStats};
use crate::storage::database::format_datetime;
use crate::storage::Database;

/// Read-only statistics queries.
pub struct StatsRepo {
    db: Arc<Database>,
}

impl StatsRepo {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Approved-completion totals and per-day counts for the last
    /// `window_days` days.
    pub fn task_stats(&self, assignee_id: i64, window_days: i64) -> Result<TaskStats> {
        let since = format_datetime(Utc::now() - Duration::days(window_days.max(0)));
        self.db.with_conn(|conn| {
            let (total_completions, total_points) = conn
                .query_row(
                    "SELECT COUNT(*), COALESCE(SUM(points_snapshot), 0)
                     FROM task_completions
                     WHERE assignee_id = ?1 AND status = 'approved' AND reviewed_at >= ?2",
                    params![assignee_id, since],
                    |row| Ok((row.get::<_, u64>(0)?, row.get::<_, i64>(1)?)),
                )
                .map_err(DatabaseError::from)?;

            // Timestamps are stored as UTC RFC 3339 text, so the date is
            // the first ten characters.
            let mut stmt = conn
                .prepare(
                    "SELECT substr(reviewed_at, 1, 10) AS day, COUNT(*)
                     FROM task_completions
                     WHERE assignee_id = ?1 AND status = 'approved' AND reviewed_at >= ?2
                     GROUP BY day
                     ORDER BY day",
                )
                .map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![assignee_id, since], |row| {
                    Ok(DailyCount {
                        date: row.get(0)?,
                        count: row.get(1)?,
                    })
                })
                .map_err(DatabaseError::from)?;
            let daily_counts = rows
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(DatabaseError::from)?;

            Ok(TaskStats {
                total_completions,
                total_points,
                daily_counts,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AutoPunishment, Frequency, RecurrenceRule, Role};
    use crate::tasks::{NewTask, TaskRepo};
    use crate::users::UserRepo;

    fn setup() -> (Arc<Database>, TaskRepo, StatsRepo) {
        let db = Arc::new(Database::open_memory().unwrap());
        let users = UserRepo::new(db.clone());
        users.register(1, "dom", Role::Supervisor).unwrap();
        users.register(2, "sub", Role::Assignee).unwrap();
        users.link(1, 2).unwrap();
        (db.clone(), TaskRepo::new(db.clone()), StatsRepo::new(db))
    }

    fn task(points: i64) -> NewTask {
        NewTask {
            supervisor_id: 1,
            assignee_id: 2,
            title: format!("Task worth {points}"),
            description: String::new(),
            frequency: Frequency::Daily,
            point_value: points,
            deadline: None,
            recurrence: RecurrenceRule::default(),
            anchor_time: None,
            auto_punishment: AutoPunishment::None,
            reminder_hours: None,
        }
    }

    fn complete_and_review(tasks: &TaskRepo, task_id: i64, approve: bool) {
        let completion = tasks.submit_completion(task_id, 2, None).unwrap();
        tasks
            .review_completion(completion.id, 1, approve, false)
            .unwrap();
    }

    #[test]
    fn counts_only_approved_completions() {
        let (_db, tasks, stats) = setup();
        let a = tasks.create(task(10)).unwrap();
        let b = tasks.create(task(15)).unwrap();
        let c = tasks.create(task(99)).unwrap();

        complete_and_review(&tasks, a.id, true);
        complete_and_review(&tasks, b.id, true);
        complete_and_review(&tasks, c.id, false);

        let report = stats.task_stats(2, 7).unwrap();
        assert_eq!(report.total_completions, 2);
        assert_eq!(report.total_points, 25);
        assert_eq!(report.daily_counts.len(), 1);
        assert_eq!(report.daily_counts[0].count, 2);
    }

    #[test]
    fn window_excludes_old_completions() {
        let (db, tasks, stats) = setup();
        let a = tasks.create(task(10)).unwrap();
        complete_and_review(&tasks, a.id, true);

        // Push the review outside the window.
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE task_completions SET reviewed_at = ?1",
                params![format_datetime(Utc::now() - Duration::days(10))],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
        .unwrap();

        let report = stats.task_stats(2, 7).unwrap();
        assert_eq!(report.total_completions, 0);
        assert!(report.daily_counts.is_empty());

        let report = stats.task_stats(2, 30).unwrap();
        assert_eq!(report.total_completions, 1);
    }

    #[test]
    fn empty_history_is_zeroed() {
        let (_db, _tasks, stats) = setup();
        let report = stats.task_stats(2, 7).unwrap();
        assert_eq!(report.total_completions, 0);
        assert_eq!(report.total_points, 0);
        assert!(report.daily_counts.is_empty());
    }
}
