//! Punishment catalog and assignment state machine.
//!
//! Assignments move `pending -> submitted -> approved | rejected`, with a
//! deadline-miss branch `pending -> expired -> submitted` that doubles the
//! penalty and deducts it. Approval after an expiry refunds the doubled
//! penalty; `expired_at` tracks that history because a late submission
//! moves the status on while the deduction stands.
//!
//! Forwarded proof is released strictly on approval, returned to the caller
//! as an outbox value so best-effort delivery can never roll back the
//! committed transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rusqlite::{params, Connection};

use crate::error::{CoreError, DatabaseError, Result};
use crate::ledger;
use crate::model::{
    Assignment, AssignmentKind, AssignmentStatus, AutoPunishment, Punishment,
};
use crate::storage::database::{
    self, format_assignment_kind, format_assignment_status, format_datetime, ASSIGNMENT_COLS,
    PUNISHMENT_COLS,
};
use crate::storage::{ids, Database};
use crate::users;

/// Input for a direct punishment assignment.
#[derive(Debug, Clone)]
pub struct NewPunishmentAssignment {
    pub supervisor_id: i64,
    pub assignee_id: i64,
    /// Specific catalog entry or a random pick from the supervisor's
    /// catalog.
    pub punishment: AutoPunishment,
    pub reason: Option<String>,
    pub deadline: DateTime<Utc>,
    pub penalty: i64,
    pub forward_to: Option<String>,
    pub reminder_hours: Option<i64>,
}

/// Proof delivery instruction produced on approval when a forward-to
/// identity is set. The adapter delivers it best-effort.
#[derive(Debug, Clone)]
pub struct ProofRelease {
    pub assignment_id: i64,
    pub to: String,
    pub proof_url: Option<String>,
}

/// Result of reviewing or cancelling a punishment assignment.
#[derive(Debug, Clone)]
pub struct ProofReviewOutcome {
    pub status: AssignmentStatus,
    /// Points paid back: the doubled penalty when the assignment had
    /// reached expired before this review, otherwise 0.
    pub refunded: i64,
    pub new_balance: Option<i64>,
    pub forward: Option<ProofRelease>,
}

/// Repository for punishments and their assignments.
pub struct PunishmentRepo {
    db: Arc<Database>,
}

impl PunishmentRepo {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // ── Catalog ──────────────────────────────────────────────────────

    /// Create a catalog punishment. Title is unique per supervisor.
    pub fn create(&self, supervisor_id: i64, title: &str, description: &str) -> Result<Punishment> {
        self.db.with_conn(|conn| {
            require_supervisor(conn, supervisor_id, "create punishments")?;
            let id = ids::first_free_id(conn, "punishments").map_err(DatabaseError::from)?;
            conn.execute(
                "INSERT INTO punishments (id, supervisor_id, title, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    supervisor_id,
                    title,
                    description,
                    format_datetime(Utc::now())
                ],
            )
            .map_err(DatabaseError::from)?;
            get_punishment(conn, id)
        })
    }

    pub fn get(&self, punishment_id: i64) -> Result<Punishment> {
        self.db.with_conn(|conn| get_punishment(conn, punishment_id))
    }

    /// Catalog entries owned by a supervisor.
    pub fn list(&self, supervisor_id: i64) -> Result<Vec<Punishment>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {PUNISHMENT_COLS} FROM punishments WHERE supervisor_id = ?1 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![supervisor_id], database::row_to_punishment)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// Delete a catalog punishment and its assignments. Owning supervisor
    /// only. Tasks referencing it fall back to no cascade.
    pub fn delete(&self, supervisor_id: i64, punishment_id: i64) -> Result<()> {
        self.db.with_tx(|conn| {
            let punishment = get_punishment(conn, punishment_id)?;
            if punishment.supervisor_id != supervisor_id {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("delete punishment {punishment_id}"),
                });
            }
            conn.execute(
                "DELETE FROM assignments WHERE kind = 'punishment' AND item_id = ?1",
                params![punishment_id],
            )
            .map_err(DatabaseError::from)?;
            conn.execute(
                "UPDATE tasks SET auto_punishment_id = NULL WHERE auto_punishment_id = ?1",
                params![punishment_id],
            )
            .map_err(DatabaseError::from)?;
            conn.execute(
                "DELETE FROM punishments WHERE id = ?1",
                params![punishment_id],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
    }

    // ── Assignments ──────────────────────────────────────────────────

    /// Assign a punishment directly.
    pub fn assign(&self, new: NewPunishmentAssignment) -> Result<Assignment> {
        self.db.with_tx(|conn| {
            if !users::is_linked(conn, new.supervisor_id, new.assignee_id)? {
                return Err(CoreError::Unauthorized {
                    actor: new.supervisor_id,
                    action: format!("punish unlinked user {}", new.assignee_id),
                });
            }
            let item_id = resolve_punishment(conn, new.supervisor_id, new.punishment)?
                .ok_or(CoreError::NotFound {
                    entity: "punishment",
                    id: 0,
                })?;
            let id = insert_assignment(
                conn,
                AssignmentKind::Punishment,
                item_id,
                new.supervisor_id,
                new.assignee_id,
                new.reason.as_deref(),
                Some(new.deadline),
                Some(new.penalty),
                new.forward_to.as_deref(),
                new.reminder_hours,
                AssignmentStatus::Pending,
            )?;
            get_assignment(conn, id)
        })
    }

    pub fn get_assignment(&self, assignment_id: i64) -> Result<Assignment> {
        self.db
            .with_conn(|conn| get_assignment(conn, assignment_id))
    }

    /// Punishment assignments for an assignee, open ones unless
    /// `include_terminal`.
    pub fn list_for_assignee(
        &self,
        assignee_id: i64,
        include_terminal: bool,
    ) -> Result<Vec<Assignment>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {ASSIGNMENT_COLS} FROM assignments
                 WHERE kind = 'punishment' AND assignee_id = ?1 {}
                 ORDER BY id",
                if include_terminal {
                    ""
                } else {
                    "AND status IN ('pending', 'submitted', 'expired')"
                }
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![assignee_id], database::row_to_assignment)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// Submitted proofs awaiting review by a supervisor, oldest first.
    pub fn submitted_proofs(&self, supervisor_id: i64) -> Result<Vec<Assignment>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {ASSIGNMENT_COLS} FROM assignments
                 WHERE kind = 'punishment' AND supervisor_id = ?1 AND status = 'submitted'
                 ORDER BY assigned_at"
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![supervisor_id], database::row_to_assignment)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// Submit proof for a pending or expired assignment. Late proof after
    /// expiry is accepted; the doubled penalty stays deducted until
    /// approval.
    pub fn submit_proof(
        &self,
        assignment_id: i64,
        assignee_id: i64,
        proof_url: &str,
    ) -> Result<Assignment> {
        self.db.with_tx(|conn| {
            let assignment = get_assignment(conn, assignment_id)?;
            if assignment.assignee_id != assignee_id {
                return Err(CoreError::Unauthorized {
                    actor: assignee_id,
                    action: format!("submit proof for assignment {assignment_id}"),
                });
            }
            if !assignment
                .status
                .can_transition_to(&AssignmentStatus::Submitted)
            {
                return Err(CoreError::AlreadyReviewed {
                    entity: "assignment",
                    id: assignment_id,
                    status: format_assignment_status(assignment.status).to_string(),
                });
            }
            conn.execute(
                "UPDATE assignments SET status = 'submitted', proof_url = ?1 WHERE id = ?2",
                params![proof_url, assignment_id],
            )
            .map_err(DatabaseError::from)?;
            get_assignment(conn, assignment_id)
        })
    }

    /// Review a submitted proof.
    ///
    /// Approval refunds the doubled penalty when the assignment had expired
    /// before the late submission, and releases the proof to the forward-to
    /// identity if one is set. Rejection changes no points.
    pub fn review_proof(
        &self,
        assignment_id: i64,
        reviewer_id: i64,
        approved: bool,
    ) -> Result<ProofReviewOutcome> {
        self.db.with_tx(|conn| {
            let assignment = get_assignment(conn, assignment_id)?;
            if assignment.supervisor_id != reviewer_id {
                return Err(CoreError::Unauthorized {
                    actor: reviewer_id,
                    action: format!("review assignment {assignment_id}"),
                });
            }
            if assignment.status != AssignmentStatus::Submitted {
                return Err(CoreError::AlreadyReviewed {
                    entity: "assignment",
                    id: assignment_id,
                    status: format_assignment_status(assignment.status).to_string(),
                });
            }
            let status = if approved {
                AssignmentStatus::Approved
            } else {
                AssignmentStatus::Rejected
            };
            finish_assignment(conn, &assignment, status)
        })
    }

    /// Force-approve a pending or submitted assignment ("cancel").
    ///
    /// Refunds the doubled penalty only if the assignment had already
    /// reached expired before cancellation; within the deadline nothing was
    /// deducted, so nothing is refunded.
    pub fn cancel(&self, assignment_id: i64, supervisor_id: i64) -> Result<ProofReviewOutcome> {
        self.db.with_tx(|conn| {
            let assignment = get_assignment(conn, assignment_id)?;
            if assignment.supervisor_id != supervisor_id {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("cancel assignment {assignment_id}"),
                });
            }
            if !matches!(
                assignment.status,
                AssignmentStatus::Pending | AssignmentStatus::Submitted
            ) {
                return Err(CoreError::AlreadyReviewed {
                    entity: "assignment",
                    id: assignment_id,
                    status: format_assignment_status(assignment.status).to_string(),
                });
            }
            finish_assignment(conn, &assignment, AssignmentStatus::Approved)
        })
    }
}

/// Terminal transition shared by review and cancel: writes the status,
/// applies the expiry refund and builds the forward-to release.
fn finish_assignment(
    conn: &Connection,
    assignment: &Assignment,
    status: AssignmentStatus,
) -> Result<ProofReviewOutcome> {
    conn.execute(
        "UPDATE assignments SET status = ?1 WHERE id = ?2",
        params![format_assignment_status(status), assignment.id],
    )
    .map_err(DatabaseError::from)?;

    let mut outcome = ProofReviewOutcome {
        status,
        refunded: 0,
        new_balance: None,
        forward: None,
    };

    if status == AssignmentStatus::Approved {
        if assignment.expired_at.is_some() {
            let refund = assignment.penalty.unwrap_or(0);
            outcome.refunded = refund;
            outcome.new_balance =
                Some(ledger::apply_delta(conn, assignment.assignee_id, refund)?);
        }
        if let Some(to) = &assignment.forward_to {
            outcome.forward = Some(ProofRelease {
                assignment_id: assignment.id,
                to: to.clone(),
                proof_url: assignment.proof_url.clone(),
            });
        }
    }

    Ok(outcome)
}

fn require_supervisor(conn: &Connection, user_id: i64, action: &str) -> Result<()> {
    let user = users::get_user(conn, user_id)?;
    if user.role != crate::model::Role::Supervisor {
        return Err(CoreError::Unauthorized {
            actor: user_id,
            action: action.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn get_punishment(conn: &Connection, punishment_id: i64) -> Result<Punishment> {
    let sql = format!("SELECT {PUNISHMENT_COLS} FROM punishments WHERE id = ?1");
    conn.query_row(&sql, params![punishment_id], database::row_to_punishment)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound {
                entity: "punishment",
                id: punishment_id,
            },
            other => DatabaseError::from(other).into(),
        })
}

pub(crate) fn get_assignment(conn: &Connection, assignment_id: i64) -> Result<Assignment> {
    let sql = format!("SELECT {ASSIGNMENT_COLS} FROM assignments WHERE id = ?1");
    conn.query_row(&sql, params![assignment_id], database::row_to_assignment)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound {
                entity: "assignment",
                id: assignment_id,
            },
            other => DatabaseError::from(other).into(),
        })
}

/// Resolve an auto-punishment reference to a concrete catalog id.
///
/// `Random` draws uniformly from the supervisor's catalog; an empty catalog
/// (or `None`) resolves to no punishment.
pub(crate) fn resolve_punishment(
    conn: &Connection,
    supervisor_id: i64,
    reference: AutoPunishment,
) -> Result<Option<i64>> {
    match reference {
        AutoPunishment::None => Ok(None),
        AutoPunishment::Specific(id) => {
            get_punishment(conn, id)?;
            Ok(Some(id))
        }
        AutoPunishment::Random => {
            let mut stmt = conn
                .prepare("SELECT id FROM punishments WHERE supervisor_id = ?1")
                .map_err(DatabaseError::from)?;
            let catalog: Vec<i64> = stmt
                .query_map(params![supervisor_id], |row| row.get(0))
                .map_err(DatabaseError::from)?
                .collect::<rusqlite::Result<_>>()
                .map_err(DatabaseError::from)?;
            Ok(catalog.choose(&mut rand::thread_rng()).copied())
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_assignment(
    conn: &Connection,
    kind: AssignmentKind,
    item_id: i64,
    supervisor_id: i64,
    assignee_id: i64,
    reason: Option<&str>,
    deadline: Option<DateTime<Utc>>,
    penalty: Option<i64>,
    forward_to: Option<&str>,
    reminder_hours: Option<i64>,
    status: AssignmentStatus,
) -> Result<i64> {
    let id = ids::first_free_id(conn, "assignments").map_err(DatabaseError::from)?;
    conn.execute(
        "INSERT INTO assignments (id, kind, item_id, supervisor_id, assignee_id, reason,
             deadline, penalty, forward_to, reminder_hours, status, assigned_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            id,
            format_assignment_kind(kind),
            item_id,
            supervisor_id,
            assignee_id,
            reason,
            deadline.map(format_datetime),
            penalty,
            forward_to,
            reminder_hours,
            format_assignment_status(status),
            format_datetime(Utc::now()),
        ],
    )
    .map_err(DatabaseError::from)?;
    Ok(id)
}

/// Punishment assignments still pending past their deadline.
pub(crate) fn expired_assignments(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Assignment>> {
    let sql = format!(
        "SELECT {ASSIGNMENT_COLS} FROM assignments
         WHERE kind = 'punishment'
           AND status = 'pending'
           AND deadline IS NOT NULL
           AND deadline < ?1
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
    let rows = stmt
        .query_map(params![format_datetime(now)], database::row_to_assignment)
        .map_err(DatabaseError::from)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| DatabaseError::from(e).into())
}

/// Expiry side effects for one assignment: double the penalty, deduct it,
/// mark expired. Returns the assignee's new balance.
pub(crate) fn expire_assignment(
    conn: &Connection,
    assignment: &Assignment,
    now: DateTime<Utc>,
) -> Result<i64> {
    let doubled = assignment.penalty.unwrap_or(0) * 2;
    conn.execute(
        "UPDATE assignments SET penalty = ?1, status = 'expired', expired_at = ?2 WHERE id = ?3",
        params![doubled, format_datetime(now), assignment.id],
    )
    .map_err(DatabaseError::from)?;
    ledger::apply_delta(conn, assignment.assignee_id, -doubled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::model::Role;
    use crate::users::UserRepo;
    use chrono::Duration;

    fn setup() -> (Arc<Database>, PunishmentRepo) {
        let db = Arc::new(Database::open_memory().unwrap());
        let users = UserRepo::new(db.clone());
        users.register(1, "dom", Role::Supervisor).unwrap();
        users.register(2, "sub", Role::Assignee).unwrap();
        users.link(1, 2).unwrap();
        (db.clone(), PunishmentRepo::new(db))
    }

    fn new_assignment(punishment: AutoPunishment) -> NewPunishmentAssignment {
        NewPunishmentAssignment {
            supervisor_id: 1,
            assignee_id: 2,
            punishment,
            reason: Some("missed curfew".to_string()),
            deadline: Utc::now() + Duration::hours(24),
            penalty: 10,
            forward_to: None,
            reminder_hours: None,
        }
    }

    fn expire(db: &Arc<Database>, assignment_id: i64) -> i64 {
        db.with_tx(|conn| {
            let assignment = get_assignment(conn, assignment_id)?;
            expire_assignment(conn, &assignment, Utc::now())
        })
        .unwrap()
    }

    #[test]
    fn assign_specific_and_random() {
        let (_db, punishments) = setup();
        let lines = punishments.create(1, "Lines", "Write 100 lines").unwrap();
        punishments.create(1, "Corner", "10 minutes").unwrap();

        let direct = punishments
            .assign(new_assignment(AutoPunishment::Specific(lines.id)))
            .unwrap();
        assert_eq!(direct.item_id, lines.id);
        assert_eq!(direct.status, AssignmentStatus::Pending);
        assert_eq!(direct.penalty, Some(10));

        let random = punishments
            .assign(new_assignment(AutoPunishment::Random))
            .unwrap();
        assert!(punishments.get(random.item_id).is_ok());
    }

    #[test]
    fn assign_from_empty_catalog_fails() {
        let (_db, punishments) = setup();
        assert!(matches!(
            punishments.assign(new_assignment(AutoPunishment::Random)),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn approve_within_deadline_refunds_nothing() {
        let (db, punishments) = setup();
        let p = punishments.create(1, "Lines", "").unwrap();
        let a = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();
        punishments.submit_proof(a.id, 2, "http://img/proof").unwrap();
        let outcome = punishments.review_proof(a.id, 1, true).unwrap();

        assert_eq!(outcome.refunded, 0);
        assert_eq!(Ledger::new(db).balance(2).unwrap(), 0);
    }

    #[test]
    fn expiry_doubles_and_late_approval_refunds_exactly() {
        let (db, punishments) = setup();
        let p = punishments.create(1, "Lines", "").unwrap();
        let a = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();

        let balance = expire(&db, a.id);
        assert_eq!(balance, -20);
        let expired = punishments.get_assignment(a.id).unwrap();
        assert_eq!(expired.status, AssignmentStatus::Expired);
        assert_eq!(expired.penalty, Some(20));

        // Late proof is still accepted, then approval refunds the doubled
        // penalty, restoring the pre-expiry balance.
        punishments.submit_proof(a.id, 2, "http://img/late").unwrap();
        let outcome = punishments.review_proof(a.id, 1, true).unwrap();
        assert_eq!(outcome.refunded, 20);
        assert_eq!(outcome.new_balance, Some(0));
    }

    #[test]
    fn rejection_keeps_deduction() {
        let (db, punishments) = setup();
        let p = punishments.create(1, "Lines", "").unwrap();
        let a = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();
        expire(&db, a.id);
        punishments.submit_proof(a.id, 2, "http://img/late").unwrap();
        let outcome = punishments.review_proof(a.id, 1, false).unwrap();
        assert_eq!(outcome.refunded, 0);
        assert_eq!(Ledger::new(db).balance(2).unwrap(), -20);
    }

    #[test]
    fn cancel_refunds_only_after_expiry() {
        let (db, punishments) = setup();
        let p = punishments.create(1, "Lines", "").unwrap();

        // Cancel within deadline: nothing was deducted, nothing refunded.
        let within = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();
        let outcome = punishments.cancel(within.id, 1).unwrap();
        assert_eq!(outcome.status, AssignmentStatus::Approved);
        assert_eq!(outcome.refunded, 0);

        // Cancel after expiry and late submission: refund the doubled
        // penalty that was already deducted.
        let expired = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();
        expire(&db, expired.id);
        punishments.submit_proof(expired.id, 2, "http://img").unwrap();
        let outcome = punishments.cancel(expired.id, 1).unwrap();
        assert_eq!(outcome.refunded, 20);
        assert_eq!(Ledger::new(db).balance(2).unwrap(), 0);
    }

    #[test]
    fn forward_release_only_on_approval() {
        let (_db, punishments) = setup();
        let p = punishments.create(1, "Lines", "").unwrap();
        let mut with_forward = new_assignment(AutoPunishment::Specific(p.id));
        with_forward.forward_to = Some("third-party".to_string());

        let rejected = punishments.assign(with_forward.clone()).unwrap();
        punishments.submit_proof(rejected.id, 2, "http://img/1").unwrap();
        let outcome = punishments.review_proof(rejected.id, 1, false).unwrap();
        assert!(outcome.forward.is_none());

        let approved = punishments.assign(with_forward).unwrap();
        punishments.submit_proof(approved.id, 2, "http://img/2").unwrap();
        let outcome = punishments.review_proof(approved.id, 1, true).unwrap();
        let release = outcome.forward.unwrap();
        assert_eq!(release.to, "third-party");
        assert_eq!(release.proof_url.as_deref(), Some("http://img/2"));
    }

    #[test]
    fn review_without_submission_is_rejected() {
        let (_db, punishments) = setup();
        let p = punishments.create(1, "Lines", "").unwrap();
        let a = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();
        assert!(matches!(
            punishments.review_proof(a.id, 1, true),
            Err(CoreError::AlreadyReviewed { .. })
        ));
    }

    #[test]
    fn double_review_observes_terminal_status() {
        let (_db, punishments) = setup();
        let p = punishments.create(1, "Lines", "").unwrap();
        let a = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();
        punishments.submit_proof(a.id, 2, "http://img").unwrap();
        punishments.review_proof(a.id, 1, true).unwrap();
        assert!(matches!(
            punishments.review_proof(a.id, 1, false),
            Err(CoreError::AlreadyReviewed { .. })
        ));
    }

    #[test]
    fn only_the_owner_reviews() {
        let (db, punishments) = setup();
        let users = UserRepo::new(db);
        users.register(3, "other", Role::Supervisor).unwrap();
        let p = punishments.create(1, "Lines", "").unwrap();
        let a = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();
        punishments.submit_proof(a.id, 2, "http://img").unwrap();
        assert!(matches!(
            punishments.review_proof(a.id, 3, true),
            Err(CoreError::Unauthorized { actor: 3, .. })
        ));
    }

    #[test]
    fn delete_cascades_assignments() {
        let (_db, punishments) = setup();
        let p = punishments.create(1, "Lines", "").unwrap();
        let a = punishments
            .assign(new_assignment(AutoPunishment::Specific(p.id)))
            .unwrap();
        punishments.delete(1, p.id).unwrap();
        assert!(matches!(
            punishments.get(p.id),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            punishments.get_assignment(a.id),
            Err(CoreError::NotFound { .. })
        ));
    }
}
