//! User registration and supervisor/assignee relationships.
//!
//! Roles are fixed at registration and never change. Relationships are
//! directed supervisor -> assignee edges, unique per ordered pair; an
//! assignee may be linked to several supervisors.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CoreError, DatabaseError, Result};
use crate::model::{Relationship, Role, User};
use crate::recurrence;
use crate::storage::database::{
    self, format_datetime, format_role, RELATIONSHIP_COLS, USER_COLS,
};
use crate::storage::Database;

/// Repository for users and relationship edges.
pub struct UserRepo {
    db: Arc<Database>,
}

impl UserRepo {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a new identity with a fixed role.
    ///
    /// # Errors
    /// `DuplicateRegistration` if the identity is already registered.
    pub fn register(&self, user_id: i64, username: &str, role: Role) -> Result<User> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user_id,
                    username,
                    format_role(role),
                    format_datetime(Utc::now())
                ],
            )
            .map_err(|e| map_constraint(e, CoreError::DuplicateRegistration(user_id)))?;
            get_user(conn, user_id)
        })
    }

    pub fn get(&self, user_id: i64) -> Result<User> {
        self.db.with_conn(|conn| get_user(conn, user_id))
    }

    /// Link a supervisor with an assignee.
    ///
    /// Both parties must be registered with the matching role.
    ///
    /// # Errors
    /// `Unauthorized` on a role mismatch, `DuplicateRelationship` if the
    /// pair is already linked.
    pub fn link(&self, supervisor_id: i64, assignee_id: i64) -> Result<Relationship> {
        self.db.with_conn(|conn| {
            let supervisor = get_user(conn, supervisor_id)?;
            if supervisor.role != Role::Supervisor {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: "link assignees".to_string(),
                });
            }
            let assignee = get_user(conn, assignee_id)?;
            if assignee.role != Role::Assignee {
                return Err(CoreError::Unauthorized {
                    actor: supervisor_id,
                    action: format!("link user {assignee_id} who is not an assignee"),
                });
            }

            conn.execute(
                "INSERT INTO relationships (supervisor_id, assignee_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![supervisor_id, assignee_id, format_datetime(Utc::now())],
            )
            .map_err(|e| {
                map_constraint(
                    e,
                    CoreError::DuplicateRelationship {
                        supervisor: supervisor_id,
                        assignee: assignee_id,
                    },
                )
            })?;

            let sql = format!(
                "SELECT {RELATIONSHIP_COLS} FROM relationships
                 WHERE supervisor_id = ?1 AND assignee_id = ?2"
            );
            conn.query_row(
                &sql,
                params![supervisor_id, assignee_id],
                database::row_to_relationship,
            )
            .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// All assignees linked to this supervisor.
    pub fn assignees_of(&self, supervisor_id: i64) -> Result<Vec<User>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users u
                 JOIN relationships r ON u.user_id = r.assignee_id
                 WHERE r.supervisor_id = ?1
                 ORDER BY r.created_at, r.id",
                qualified_user_cols()
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![supervisor_id], database::row_to_user)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// All supervisors linked to this assignee.
    pub fn supervisors_of(&self, assignee_id: i64) -> Result<Vec<User>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users u
                 JOIN relationships r ON u.user_id = r.supervisor_id
                 WHERE r.assignee_id = ?1
                 ORDER BY r.created_at, r.id",
                qualified_user_cols()
            );
            let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
            let rows = stmt
                .query_map(params![assignee_id], database::row_to_user)
                .map_err(DatabaseError::from)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// The assignee's single supervisor for paths that need exactly one:
    /// deterministically the earliest-created relationship edge.
    pub fn dominant_supervisor(&self, assignee_id: i64) -> Result<Option<User>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users u
                 JOIN relationships r ON u.user_id = r.supervisor_id
                 WHERE r.assignee_id = ?1
                 ORDER BY r.created_at, r.id
                 LIMIT 1",
                qualified_user_cols()
            );
            conn.query_row(&sql, params![assignee_id], database::row_to_user)
                .optional()
                .map_err(|e| DatabaseError::from(e).into())
        })
    }

    /// Whether a supervisor -> assignee edge exists.
    pub fn is_linked(&self, supervisor_id: i64, assignee_id: i64) -> Result<bool> {
        self.db
            .with_conn(|conn| is_linked(conn, supervisor_id, assignee_id))
    }

    /// Update a user's timezone.
    ///
    /// # Errors
    /// `InvalidTimezone` if the name is not an IANA identifier.
    pub fn set_timezone(&self, user_id: i64, timezone: &str) -> Result<()> {
        recurrence::parse_timezone(timezone)?;
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET timezone = ?1 WHERE user_id = ?2",
                    params![timezone, user_id],
                )
                .map_err(DatabaseError::from)?;
            if changed == 0 {
                return Err(CoreError::NotFound {
                    entity: "user",
                    id: user_id,
                });
            }
            Ok(())
        })
    }
}

fn qualified_user_cols() -> String {
    database::qualify(USER_COLS, "u")
}

fn map_constraint(e: rusqlite::Error, duplicate: CoreError) -> CoreError {
    let mapped: CoreError = DatabaseError::from(e).into();
    if mapped.is_constraint() {
        duplicate
    } else {
        mapped
    }
}

pub(crate) fn get_user(conn: &Connection, user_id: i64) -> Result<User> {
    let sql = format!("SELECT {USER_COLS} FROM users WHERE user_id = ?1");
    conn.query_row(&sql, params![user_id], database::row_to_user)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound {
                entity: "user",
                id: user_id,
            },
            other => DatabaseError::from(other).into(),
        })
}

pub(crate) fn is_linked(conn: &Connection, supervisor_id: i64, assignee_id: i64) -> Result<bool> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM relationships WHERE supervisor_id = ?1 AND assignee_id = ?2",
            params![supervisor_id, assignee_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(DatabaseError::from)?;
    Ok(exists.is_some())
}

/// Ids of every supervisor linked to the assignee.
pub(crate) fn supervisor_ids_of(conn: &Connection, assignee_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT supervisor_id FROM relationships WHERE assignee_id = ?1")
        .map_err(DatabaseError::from)?;
    let rows = stmt
        .query_map(params![assignee_id], |row| row.get(0))
        .map_err(DatabaseError::from)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| DatabaseError::from(e).into())
}

/// The user's timezone, falling back to UTC on a corrupt value.
pub(crate) fn timezone_of(conn: &Connection, user_id: i64) -> chrono_tz::Tz {
    let name: Option<String> = conn
        .query_row(
            "SELECT timezone FROM users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .unwrap_or(None);
    name.and_then(|n| n.parse().ok()).unwrap_or(chrono_tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> UserRepo {
        UserRepo::new(Arc::new(Database::open_memory().unwrap()))
    }

    #[test]
    fn register_and_get() {
        let users = repo();
        let user = users.register(1, "dom", Role::Supervisor).unwrap();
        assert_eq!(user.role, Role::Supervisor);
        assert_eq!(user.points, 0);
        assert_eq!(user.timezone, "UTC");
        assert_eq!(users.get(1).unwrap().username, "dom");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let users = repo();
        users.register(1, "dom", Role::Supervisor).unwrap();
        assert!(matches!(
            users.register(1, "dom", Role::Supervisor),
            Err(CoreError::DuplicateRegistration(1))
        ));
    }

    #[test]
    fn link_requires_matching_roles() {
        let users = repo();
        users.register(1, "dom", Role::Supervisor).unwrap();
        users.register(2, "sub", Role::Assignee).unwrap();

        assert!(matches!(
            users.link(2, 1),
            Err(CoreError::Unauthorized { actor: 2, .. })
        ));
        users.link(1, 2).unwrap();
        assert!(users.is_linked(1, 2).unwrap());
        assert!(!users.is_linked(2, 1).unwrap());
    }

    #[test]
    fn duplicate_relationship_is_rejected() {
        let users = repo();
        users.register(1, "dom", Role::Supervisor).unwrap();
        users.register(2, "sub", Role::Assignee).unwrap();
        users.link(1, 2).unwrap();
        assert!(matches!(
            users.link(1, 2),
            Err(CoreError::DuplicateRelationship {
                supervisor: 1,
                assignee: 2
            })
        ));
    }

    #[test]
    fn dominant_supervisor_is_earliest_edge() {
        let users = repo();
        users.register(1, "dom-a", Role::Supervisor).unwrap();
        users.register(2, "dom-b", Role::Supervisor).unwrap();
        users.register(3, "sub", Role::Assignee).unwrap();
        users.link(1, 3).unwrap();
        users.link(2, 3).unwrap();

        let dominant = users.dominant_supervisor(3).unwrap().unwrap();
        assert_eq!(dominant.id, 1);
        assert_eq!(users.supervisors_of(3).unwrap().len(), 2);
    }

    #[test]
    fn timezone_update_is_validated() {
        let users = repo();
        users.register(2, "sub", Role::Assignee).unwrap();
        users.set_timezone(2, "Europe/Berlin").unwrap();
        assert_eq!(users.get(2).unwrap().timezone, "Europe/Berlin");
        assert!(matches!(
            users.set_timezone(2, "Nowhere/Land"),
            Err(CoreError::InvalidTimezone(_))
        ));
    }
}
