//! SQLite store handle shared by every engine component.
//!
//! One `Database` owns the connection behind a mutex, making the handle
//! `Send + Sync`. The mutex is the serialization boundary required for
//! point deltas and check-then-set reviews: the command adapter and both
//! periodic sweeps share a single `Arc<Database>` and every operation runs
//! under one lock acquisition.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use rusqlite::{Connection, Row};

use crate::error::{DatabaseError, Result};
use crate::model::{
    Assignment, AssignmentKind, AssignmentStatus, AutoPunishment, CompletionStatus, Frequency,
    PointThreshold, Punishment, RecurrenceRule, Relationship, Reward, Role, Task, TaskCompletion,
    User,
};
use crate::recurrence;

use super::{data_dir, migrations};

/// Shared SQLite database handle.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data_dir>/overseer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("overseer.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source: e,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(DatabaseError::from)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with the connection, holding the store lock.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        f(&guard)
    }

    /// Run a closure against the underlying SQLite connection.
    ///
    /// Escape hatch for adapters and tests that need raw SQL access.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let guard = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        f(&guard).map_err(|e| DatabaseError::from(e).into())
    }

    /// Run `f` inside a transaction, holding the store lock.
    ///
    /// The transaction commits when `f` returns Ok and rolls back on Err,
    /// so a failure mid-way through a multi-step transition leaves no
    /// partial state behind.
    pub(crate) fn with_tx<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        let tx = guard.unchecked_transaction().map_err(DatabaseError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok(out)
    }
}

// === Column lists ===
//
// SELECTs always name these explicitly so the row mappers below can read
// by index.

pub(crate) const USER_COLS: &str = "user_id, username, role, points, timezone, created_at";

pub(crate) const RELATIONSHIP_COLS: &str = "id, supervisor_id, assignee_id, created_at";

pub(crate) const TASK_COLS: &str = "id, supervisor_id, assignee_id, title, description, \
     frequency, point_value, deadline, recurrence_enabled, interval_hours, weekdays, \
     time_of_day, next_occurrence, anchor_time, auto_punishment_id, active, \
     reminder_hours, last_reminded_at, created_at";

pub(crate) const COMPLETION_COLS: &str = "id, task_id, assignee_id, proof_url, \
     points_snapshot, status, submitted_at, reviewed_by, reviewed_at";

pub(crate) const REWARD_COLS: &str =
    "id, supervisor_id, title, description, point_cost, created_at";

pub(crate) const PUNISHMENT_COLS: &str = "id, supervisor_id, title, description, created_at";

pub(crate) const ASSIGNMENT_COLS: &str = "id, kind, item_id, supervisor_id, assignee_id, \
     reason, deadline, penalty, proof_url, forward_to, status, expired_at, \
     reminder_hours, last_reminded_at, assigned_at";

pub(crate) const THRESHOLD_COLS: &str = "id, supervisor_id, assignee_id, threshold_points, \
     punishment_id, penalty, active, last_triggered_at, created_at";

/// Prefix every column in a column list with a table alias, for joins.
pub(crate) fn qualify(cols: &str, alias: &str) -> String {
    cols.split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

// === Value helpers ===

pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse an RFC 3339 string, falling back to the current time on a corrupt
/// row rather than failing the whole query.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_datetime)
}

pub(crate) fn format_role(role: Role) -> &'static str {
    match role {
        Role::Supervisor => "supervisor",
        Role::Assignee => "assignee",
    }
}

pub(crate) fn parse_role(s: &str) -> Role {
    match s {
        "supervisor" => Role::Supervisor,
        _ => Role::Assignee,
    }
}

pub(crate) fn format_frequency(f: Frequency) -> &'static str {
    match f {
        Frequency::Daily => "daily",
        Frequency::Weekly => "weekly",
        Frequency::Custom => "custom",
    }
}

pub(crate) fn parse_frequency(s: &str) -> Frequency {
    match s {
        "daily" => Frequency::Daily,
        "weekly" => Frequency::Weekly,
        _ => Frequency::Custom,
    }
}

pub(crate) fn format_completion_status(s: CompletionStatus) -> &'static str {
    match s {
        CompletionStatus::Pending => "pending",
        CompletionStatus::Approved => "approved",
        CompletionStatus::Rejected => "rejected",
    }
}

pub(crate) fn parse_completion_status(s: &str) -> CompletionStatus {
    match s {
        "approved" => CompletionStatus::Approved,
        "rejected" => CompletionStatus::Rejected,
        _ => CompletionStatus::Pending,
    }
}

pub(crate) fn format_assignment_kind(k: AssignmentKind) -> &'static str {
    match k {
        AssignmentKind::Reward => "reward",
        AssignmentKind::Punishment => "punishment",
    }
}

pub(crate) fn parse_assignment_kind(s: &str) -> AssignmentKind {
    match s {
        "reward" => AssignmentKind::Reward,
        _ => AssignmentKind::Punishment,
    }
}

pub(crate) fn format_assignment_status(s: AssignmentStatus) -> &'static str {
    match s {
        AssignmentStatus::Pending => "pending",
        AssignmentStatus::Submitted => "submitted",
        AssignmentStatus::Approved => "approved",
        AssignmentStatus::Rejected => "rejected",
        AssignmentStatus::Expired => "expired",
        AssignmentStatus::Granted => "granted",
    }
}

pub(crate) fn parse_assignment_status(s: &str) -> AssignmentStatus {
    match s {
        "submitted" => AssignmentStatus::Submitted,
        "approved" => AssignmentStatus::Approved,
        "rejected" => AssignmentStatus::Rejected,
        "expired" => AssignmentStatus::Expired,
        "granted" => AssignmentStatus::Granted,
        _ => AssignmentStatus::Pending,
    }
}

/// Column encoding for auto-punishment references: NULL = none,
/// 0 = random catalog pick, otherwise a punishment id.
pub(crate) fn auto_punishment_to_db(ap: AutoPunishment) -> Option<i64> {
    match ap {
        AutoPunishment::None => None,
        AutoPunishment::Random => Some(0),
        AutoPunishment::Specific(id) => Some(id),
    }
}

pub(crate) fn auto_punishment_from_db(v: Option<i64>) -> AutoPunishment {
    match v {
        None => AutoPunishment::None,
        Some(0) => AutoPunishment::Random,
        Some(id) => AutoPunishment::Specific(id),
    }
}

pub(crate) fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

pub(crate) fn parse_time_opt(s: Option<String>) -> Option<NaiveTime> {
    s.and_then(|s| NaiveTime::parse_from_str(&s, "%H:%M").ok())
}

pub(crate) fn format_weekdays(days: &[Weekday]) -> String {
    days.iter()
        .map(|d| recurrence::weekday_code(*d))
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn parse_weekdays_opt(s: Option<String>) -> Option<Vec<Weekday>> {
    s.map(|s| {
        s.split(',')
            .filter_map(|code| recurrence::parse_weekday(code.trim()))
            .collect()
    })
}

// === Row mappers ===

pub(crate) fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        role: parse_role(&row.get::<_, String>(2)?),
        points: row.get(3)?,
        timezone: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

pub(crate) fn row_to_relationship(row: &Row) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get(0)?,
        supervisor_id: row.get(1)?,
        assignee_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

pub(crate) fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        supervisor_id: row.get(1)?,
        assignee_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        frequency: parse_frequency(&row.get::<_, String>(5)?),
        point_value: row.get(6)?,
        deadline: parse_datetime_opt(row.get(7)?),
        recurrence: RecurrenceRule {
            enabled: row.get(8)?,
            interval_hours: row.get(9)?,
            weekdays: parse_weekdays_opt(row.get(10)?),
            time_of_day: parse_time_opt(row.get(11)?),
        },
        next_occurrence: parse_datetime_opt(row.get(12)?),
        anchor_time: parse_time_opt(row.get(13)?),
        auto_punishment: auto_punishment_from_db(row.get(14)?),
        active: row.get(15)?,
        reminder_hours: row.get(16)?,
        last_reminded_at: parse_datetime_opt(row.get(17)?),
        created_at: parse_datetime(&row.get::<_, String>(18)?),
    })
}

pub(crate) fn row_to_completion(row: &Row) -> rusqlite::Result<TaskCompletion> {
    Ok(TaskCompletion {
        id: row.get(0)?,
        task_id: row.get(1)?,
        assignee_id: row.get(2)?,
        proof_url: row.get(3)?,
        points_snapshot: row.get(4)?,
        status: parse_completion_status(&row.get::<_, String>(5)?),
        submitted_at: parse_datetime(&row.get::<_, String>(6)?),
        reviewed_by: row.get(7)?,
        reviewed_at: parse_datetime_opt(row.get(8)?),
    })
}

pub(crate) fn row_to_reward(row: &Row) -> rusqlite::Result<Reward> {
    Ok(Reward {
        id: row.get(0)?,
        supervisor_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        point_cost: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

pub(crate) fn row_to_punishment(row: &Row) -> rusqlite::Result<Punishment> {
    Ok(Punishment {
        id: row.get(0)?,
        supervisor_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

pub(crate) fn row_to_assignment(row: &Row) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        kind: parse_assignment_kind(&row.get::<_, String>(1)?),
        item_id: row.get(2)?,
        supervisor_id: row.get(3)?,
        assignee_id: row.get(4)?,
        reason: row.get(5)?,
        deadline: parse_datetime_opt(row.get(6)?),
        penalty: row.get(7)?,
        proof_url: row.get(8)?,
        forward_to: row.get(9)?,
        status: parse_assignment_status(&row.get::<_, String>(10)?),
        expired_at: parse_datetime_opt(row.get(11)?),
        reminder_hours: row.get(12)?,
        last_reminded_at: parse_datetime_opt(row.get(13)?),
        assigned_at: parse_datetime(&row.get::<_, String>(14)?),
    })
}

pub(crate) fn row_to_threshold(row: &Row) -> rusqlite::Result<PointThreshold> {
    Ok(PointThreshold {
        id: row.get(0)?,
        supervisor_id: row.get(1)?,
        assignee_id: row.get(2)?,
        threshold_points: row.get(3)?,
        punishment: auto_punishment_from_db(row.get(4)?),
        penalty: row.get(5)?,
        active: row.get(6)?,
        last_triggered_at: parse_datetime_opt(row.get(7)?),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}
