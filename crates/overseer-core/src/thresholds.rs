//! Point thresholds: standing punishments triggered by low balances.
//!
//! A threshold fires when the assignee's balance drops strictly below
//! `threshold_points`. Each rule carries its own 24-hour cooldown
//! (`last_triggered_at`) so one low balance does not re-fire the same rule
//! on every subsequent deduction.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use crate::error::{CoreError, DatabaseError, Result};
use crate::model::{AssignmentKind, AssignmentStatus, AutoPunishment, PointThreshold};
use crate::punishments;
use crate::storage::database::{
    self, auto_punishment_to_db, format_datetime, THRESHOLD_COLS,
};
use crate::storage::{ids, Database};
use crate::users;

/// Hours a rule stays quiet after firing.
pub const COOLDOWN_HOURS: i64 = 24;

/// Deadline window granted to threshold-spawned assignments.
pub const CASCADE_DEADLINE_HOURS: i64 = 24;

/// Input for a threshold rule.
#[derive(Debug, Clone)]
pub struct NewThreshold {
    pub supervisor_id: i64,
    /// None applies the rule to all of the supervisor's assignees.
    pub assignee_id: Option<i64>,
    pub threshold_points: i64,
    pub punishment: AutoPunishment,
    pub penalty: i64,
}

/// Owns threshold rules and evaluates them against balance changes.
pub struct ThresholdEvaluator {
    db: Arc<Database>,
}

impl ThresholdEvaluator {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a threshold rule.
    pub fn create(&self, new: NewThreshold) -> Result<PointThreshold> {
        if new.punishment == AutoPunishment::None {
            return Err(CoreError::NotFound {
                entity: "punishment",
                id: 0,
            });
        }
        self.db.with_tx(|conn| {
            if let AutoPunishment::Specific(id) = new.punishment {
                let punishment = punishments::get_punishment(conn, id)?;
                if punishment.supervisor_id != new.supervisor_id {
                    return Err(CoreError::Unauthorized {
                        actor: new.supervisor_id,
                        action: format!("reference punishment {id}"),
                    });
                }
            }
            if let Some(assignee_id) = new.assignee_id {
                if !users::is_linked(conn, new.supervisor_id, assignee_id)? {
                    return Err(CoreError::Unauthorized {
                        actor: new.supervisor_id,
                        action: format!("set thresholds for unlinked user {assignee_id}"),
                    });
                }
            }

            let id = ids::first_free_id(conn, "point_thresholds").map_err(DatabaseError::from)?;
            conn.execute(
                "INSERT INTO point_thresholds (id, supervisor_id, assignee_id,
                     threshold_points, punishment_id, penalty, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                params![
                    id,
                    new.supervisor_id,
                    new.assignee_id,
                    new.threshold_points,
                    auto_punishment_to_db(new.punishment),
                    new.penalty,
                    format_datetime(Utc::now()),
                ],
            )
            .map_err(DatabaseError::from)?;
            get_threshold(conn, id)
        })
    }

    pub fn get(&self, threshold_id: i64) -> Result<PointThreshold> {
        self.db.with_conn(|conn| get_threshold(conn, threshold_id))
    }

    /// Rules owned by a supervisor.
    pub fn list(&self, supervisor_id: i64) -> Result<Vec<PointThreshold>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {THRESHOLD_COLS} FROM point_thresholds
                 WHERE supervisor_id = ?1
                 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![supervisor_id], database::row_to_threshold)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// Delete a rule. Owning supervisor only.
    pub fn delete(&self, supervisor_id: i64, threshold_id: i64) -> Result<()> {
        self.db.with_conn(|conn| {
            let threshold = get_threshold(conn, threshold_id)?;
            if threshold.supervisor_id != supervisor_id {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("delete threshold {threshold_id}"),
                });
            }
            conn.execute(
                "DELETE FROM point_thresholds WHERE id = ?1",
                params![threshold_id],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
    }

    /// Evaluate all applicable rules against a fresh balance. Returns the
    /// ids of spawned punishment assignments.
    pub fn check(&self, assignee_id: i64, new_balance: i64) -> Result<Vec<i64>> {
        self.db
            .with_tx(|conn| check_thresholds(conn, assignee_id, new_balance, Utc::now()))
    }
}

fn get_threshold(conn: &Connection, threshold_id: i64) -> Result<PointThreshold> {
    let sql = format!("SELECT {THRESHOLD_COLS} FROM point_thresholds WHERE id = ?1");
    conn.query_row(&sql, params![threshold_id], database::row_to_threshold)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound {
                entity: "threshold",
                id: threshold_id,
            },
            other => DatabaseError::from(other).into(),
        })
}

/// Connection-level evaluation, shared with the deadline sweeper so a
/// sweep entity's deduction and its cascades commit together.
///
/// Selects active rules owned by any supervisor of the assignee (targeted
/// at them or at all assignees) where `threshold_points > new_balance` and
/// the cooldown has elapsed. Every triggered rule spawns a punishment
/// assignment and records its own firing time.
pub(crate) fn check_thresholds(
    conn: &Connection,
    assignee_id: i64,
    new_balance: i64,
    now: DateTime<Utc>,
) -> Result<Vec<i64>> {
    let cooldown_edge = now - Duration::hours(COOLDOWN_HOURS);
    let sql = format!(
        "SELECT {} FROM point_thresholds pt
         JOIN relationships r
           ON r.supervisor_id = pt.supervisor_id AND r.assignee_id = ?1
         WHERE pt.active = 1
           AND (pt.assignee_id IS NULL OR pt.assignee_id = ?1)
           AND pt.threshold_points > ?2
           AND (pt.last_triggered_at IS NULL OR pt.last_triggered_at < ?3)
         ORDER BY pt.id",
        database::qualify(THRESHOLD_COLS, "pt")
    );
    let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
    let rules: Vec<PointThreshold> = stmt
        .query_map(
            params![assignee_id, new_balance, format_datetime(cooldown_edge)],
            database::row_to_threshold,
        )
        .map_err(DatabaseError::from)?
        .collect::<rusqlite::Result<_>>()
        .map_err(DatabaseError::from)?;

    let mut spawned = Vec::new();
    for rule in rules {
        let item_id =
            match punishments::resolve_punishment(conn, rule.supervisor_id, rule.punishment)? {
                Some(id) => id,
                None => {
                    eprintln!(
                        "Warning: threshold {} has no punishment to assign, skipping",
                        rule.id
                    );
                    continue;
                }
            };
        let assignment_id = punishments::insert_assignment(
            conn,
            AssignmentKind::Punishment,
            item_id,
            rule.supervisor_id,
            assignee_id,
            Some(&format!("points fell below {}", rule.threshold_points)),
            Some(now + Duration::hours(CASCADE_DEADLINE_HOURS)),
            Some(rule.penalty),
            None,
            None,
            AssignmentStatus::Pending,
        )?;
        conn.execute(
            "UPDATE point_thresholds SET last_triggered_at = ?1 WHERE id = ?2",
            params![format_datetime(now), rule.id],
        )
        .map_err(DatabaseError::from)?;
        spawned.push(assignment_id);
    }
    Ok(spawned)
}
