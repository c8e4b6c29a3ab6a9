//! Reward catalog and grants.
//!
//! Granting a reward checks affordability and deducts the cost through the
//! ledger in the same transaction, so the invariant holds regardless of
//! the calling adapter. The grant row shares the assignments table with
//! punishment assignments, tagged `kind = 'reward'`.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::{CoreError, DatabaseError, Result};
use crate::ledger;
use crate::model::{Assignment, AssignmentKind, AssignmentStatus, Reward, Role};
use crate::punishments;
use crate::storage::database::{self, format_datetime, ASSIGNMENT_COLS, REWARD_COLS};
use crate::storage::{ids, Database};
use crate::thresholds;
use crate::users;

/// Result of granting a reward.
#[derive(Debug, Clone)]
pub struct RewardGrant {
    pub assignment: Assignment,
    pub new_balance: i64,
    /// Punishment assignments spawned by thresholds the deduction crossed.
    pub threshold_assignments: Vec<i64>,
}

/// Repository for rewards and grants.
pub struct RewardRepo {
    db: Arc<Database>,
}

impl RewardRepo {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a catalog reward. Title is unique per supervisor.
    pub fn create(
        &self,
        supervisor_id: i64,
        title: &str,
        description: &str,
        point_cost: i64,
    ) -> Result<Reward> {
        self.db.with_conn(|conn| {
            let user = users::get_user(conn, supervisor_id)?;
            if user.role != Role::Supervisor {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: "create rewards".to_string(),
                });
            }
            let id = ids::first_free_id(conn, "rewards").map_err(DatabaseError::from)?;
            conn.execute(
                "INSERT INTO rewards (id, supervisor_id, title, description, point_cost, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    supervisor_id,
                    title,
                    description,
                    point_cost,
                    format_datetime(Utc::now())
                ],
            )
            .map_err(DatabaseError::from)?;
            get_reward(conn, id)
        })
    }

    pub fn get(&self, reward_id: i64) -> Result<Reward> {
        self.db.with_conn(|conn| get_reward(conn, reward_id))
    }

    /// Catalog entries owned by a supervisor.
    pub fn list(&self, supervisor_id: i64) -> Result<Vec<Reward>> {
        self.db.with_conn(|conn| {
            let sql =
                format!("SELECT {REWARD_COLS} FROM rewards WHERE supervisor_id = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![supervisor_id], database::row_to_reward)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// Delete a catalog reward and its grant records. Owning supervisor
    /// only.
    pub fn delete(&self, supervisor_id: i64, reward_id: i64) -> Result<()> {
        self.db.with_tx(|conn| {
            let reward = get_reward(conn, reward_id)?;
            if reward.supervisor_id != supervisor_id {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("delete reward {reward_id}"),
                });
            }
            conn.execute(
                "DELETE FROM assignments WHERE kind = 'reward' AND item_id = ?1",
                params![reward_id],
            )
            .map_err(DatabaseError::from)?;
            conn.execute("DELETE FROM rewards WHERE id = ?1", params![reward_id])
                .map_err(DatabaseError::from)?;
            Ok(())
        })
    }

    /// Grant a reward to an assignee, deducting its cost.
    ///
    /// # Errors
    /// `InsufficientPoints` when the assignee cannot afford the cost,
    /// `Unauthorized` for foreign rewards or unlinked assignees.
    pub fn assign(
        &self,
        supervisor_id: i64,
        assignee_id: i64,
        reward_id: i64,
        reason: Option<&str>,
    ) -> Result<RewardGrant> {
        self.db.with_tx(|conn| {
            let reward = get_reward(conn, reward_id)?;
            if reward.supervisor_id != supervisor_id {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("assign reward {reward_id}"),
                });
            }
            if !users::is_linked(conn, supervisor_id, assignee_id)? {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("reward unlinked user {assignee_id}"),
                });
            }

            let available = ledger::balance(conn, assignee_id)?;
            if available < reward.point_cost {
                return Err(CoreError::InsufficientPoints {
                    required: reward.point_cost,
                    available,
                });
            }

            let new_balance = if reward.point_cost != 0 {
                ledger::apply_delta(conn, assignee_id, -reward.point_cost)?
            } else {
                available
            };

            let assignment_id = punishments::insert_assignment(
                conn,
                AssignmentKind::Reward,
                reward_id,
                supervisor_id,
                assignee_id,
                reason,
                None,
                None,
                None,
                None,
                AssignmentStatus::Granted,
            )?;

            let threshold_assignments =
                thresholds::check_thresholds(conn, assignee_id, new_balance, Utc::now())?;

            Ok(RewardGrant {
                assignment: punishments::get_assignment(conn, assignment_id)?,
                new_balance,
                threshold_assignments,
            })
        })
    }

    /// Recent grants for an assignee, newest first.
    pub fn grants_for_assignee(&self, assignee_id: i64, limit: usize) -> Result<Vec<Assignment>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM assignments
                 WHERE kind = 'reward' AND assignee_id = ?1
                 ORDER BY assigned_at DESC
                 LIMIT ?2",
                ASSIGNMENT_COLS
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(
                    params![assignee_id, limit as i64],
                    database::row_to_assignment,
                )
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }
}

fn get_reward(conn: &Connection, reward_id: i64) -> Result<Reward> {
    let sql = format!("SELECT {REWARD_COLS} FROM rewards WHERE id = ?1");
    conn.query_row(&sql, params![reward_id], database::row_to_reward)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound {
                entity: "reward",
                id: reward_id,
            },
            other => DatabaseError::from(other).into(),
        })
}
