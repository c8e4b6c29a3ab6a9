//! Point ledger -- the single delta-apply operation.
//!
//! Every lifecycle transition that awards or penalizes routes through
//! `apply_delta`, so balance history stays attributable to exactly one
//! delta event per transition. Balances are signed and have no floor:
//! penalties may exceed the present balance.

use std::sync::Arc;

use rusqlite::{params, Connection};

use crate::error::{CoreError, DatabaseError, Result};
use crate::storage::Database;

/// Handle for point balance mutation and lookup.
pub struct Ledger {
    db: Arc<Database>,
}

impl Ledger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Apply `delta` to the user's balance and return the new balance.
    ///
    /// Atomic per user: the read-modify-write is a single UPDATE executed
    /// under the store lock, never a compare-and-swap on a cached value.
    pub fn apply_delta(&self, user_id: i64, delta: i64) -> Result<i64> {
        self.db.with_conn(|conn| apply_delta(conn, user_id, delta))
    }

    /// Current balance.
    pub fn balance(&self, user_id: i64) -> Result<i64> {
        self.db.with_conn(|conn| balance(conn, user_id))
    }
}

/// Connection-level delta apply, shared with transitions that deduct or
/// award inside a larger transaction.
pub(crate) fn apply_delta(conn: &Connection, user_id: i64, delta: i64) -> Result<i64> {
    let changed = conn
        .execute(
            "UPDATE users SET points = points + ?1 WHERE user_id = ?2",
            params![delta, user_id],
        )
        .map_err(DatabaseError::from)?;
    if changed == 0 {
        return Err(CoreError::NotFound {
            entity: "user",
            id: user_id,
        });
    }
    balance(conn, user_id)
}

pub(crate) fn balance(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT points FROM users WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound {
            entity: "user",
            id: user_id,
        },
        other => DatabaseError::from(other).into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user(user_id: i64) -> Arc<Database> {
        let db = Arc::new(Database::open_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, role, created_at)
                 VALUES (?1, 'sub', 'assignee', '2024-01-01T00:00:00+00:00')",
                params![user_id],
            )
            .map_err(DatabaseError::from)?;
            Ok(())
        })
        .unwrap();
        db
    }

    #[test]
    fn delta_accumulates() {
        let ledger = Ledger::new(db_with_user(7));
        assert_eq!(ledger.apply_delta(7, 10).unwrap(), 10);
        assert_eq!(ledger.apply_delta(7, 5).unwrap(), 15);
        assert_eq!(ledger.balance(7).unwrap(), 15);
    }

    #[test]
    fn balance_may_go_negative() {
        let ledger = Ledger::new(db_with_user(7));
        assert_eq!(ledger.apply_delta(7, -40).unwrap(), -40);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let ledger = Ledger::new(db_with_user(7));
        assert!(matches!(
            ledger.apply_delta(99, 1),
            Err(CoreError::NotFound { .. })
        ));
    }
}
