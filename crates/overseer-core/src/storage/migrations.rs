//! Database schema migrations for overseer.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current migration
//! version.

use rusqlite::{Connection, Result as SqliteResult};

/// Apply all pending migrations to bring the database to the current schema
/// version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            eprintln!("Warning: failed to read schema_version: {}", e);
        }
        0
    })
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: baseline schema.
///
/// Users, relationships, tasks, completions, catalogs and the shared
/// assignments table. Timestamps are RFC 3339 TEXT, written by the
/// repositories (no SQL-side defaults).
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id     INTEGER PRIMARY KEY,
            username    TEXT NOT NULL,
            role        TEXT NOT NULL CHECK(role IN ('supervisor', 'assignee')),
            points      INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS relationships (
            id            INTEGER PRIMARY KEY,
            supervisor_id INTEGER NOT NULL REFERENCES users(user_id),
            assignee_id   INTEGER NOT NULL REFERENCES users(user_id),
            created_at    TEXT NOT NULL,
            UNIQUE(supervisor_id, assignee_id)
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id                 INTEGER PRIMARY KEY,
            supervisor_id      INTEGER NOT NULL REFERENCES users(user_id),
            assignee_id        INTEGER NOT NULL REFERENCES users(user_id),
            title              TEXT NOT NULL,
            description        TEXT NOT NULL DEFAULT '',
            frequency          TEXT NOT NULL CHECK(frequency IN ('daily', 'weekly', 'custom')),
            point_value        INTEGER NOT NULL DEFAULT 10,
            deadline           TEXT,
            auto_punishment_id INTEGER,
            active             INTEGER NOT NULL DEFAULT 1,
            created_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS task_completions (
            id              INTEGER PRIMARY KEY,
            task_id         INTEGER NOT NULL REFERENCES tasks(id),
            assignee_id     INTEGER NOT NULL REFERENCES users(user_id),
            proof_url       TEXT,
            points_snapshot INTEGER NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending'
                            CHECK(status IN ('pending', 'approved', 'rejected')),
            submitted_at    TEXT NOT NULL,
            reviewed_by     INTEGER REFERENCES users(user_id),
            reviewed_at     TEXT
        );

        CREATE TABLE IF NOT EXISTS rewards (
            id            INTEGER PRIMARY KEY,
            supervisor_id INTEGER NOT NULL REFERENCES users(user_id),
            title         TEXT NOT NULL,
            description   TEXT NOT NULL DEFAULT '',
            point_cost    INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL,
            UNIQUE(supervisor_id, title)
        );

        CREATE TABLE IF NOT EXISTS punishments (
            id            INTEGER PRIMARY KEY,
            supervisor_id INTEGER NOT NULL REFERENCES users(user_id),
            title         TEXT NOT NULL,
            description   TEXT NOT NULL DEFAULT '',
            created_at    TEXT NOT NULL,
            UNIQUE(supervisor_id, title)
        );

        CREATE TABLE IF NOT EXISTS assignments (
            id            INTEGER PRIMARY KEY,
            kind          TEXT NOT NULL CHECK(kind IN ('reward', 'punishment')),
            item_id       INTEGER NOT NULL,
            supervisor_id INTEGER NOT NULL REFERENCES users(user_id),
            assignee_id   INTEGER NOT NULL REFERENCES users(user_id),
            reason        TEXT,
            assigned_at   TEXT NOT NULL
        );",
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: recurrence, timezone and assignment lifecycle columns.
///
/// Adds:
/// - users: timezone (IANA identifier, defaults to UTC)
/// - tasks: recurrence rule fields, next_occurrence, anchor_time,
///   reminder fields
/// - assignments: deadline, penalty, proof, forward_to, status, expired_at,
///   reminder fields
///
/// Also migrates existing data: pre-existing reward rows become 'granted'.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE users ADD COLUMN timezone TEXT NOT NULL DEFAULT 'UTC';

         ALTER TABLE tasks ADD COLUMN recurrence_enabled INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE tasks ADD COLUMN interval_hours INTEGER;
         ALTER TABLE tasks ADD COLUMN weekdays TEXT;
         ALTER TABLE tasks ADD COLUMN time_of_day TEXT;
         ALTER TABLE tasks ADD COLUMN next_occurrence TEXT;
         ALTER TABLE tasks ADD COLUMN anchor_time TEXT;
         ALTER TABLE tasks ADD COLUMN reminder_hours INTEGER;
         ALTER TABLE tasks ADD COLUMN last_reminded_at TEXT;

         ALTER TABLE assignments ADD COLUMN deadline TEXT;
         ALTER TABLE assignments ADD COLUMN penalty INTEGER;
         ALTER TABLE assignments ADD COLUMN proof_url TEXT;
         ALTER TABLE assignments ADD COLUMN forward_to TEXT;
         ALTER TABLE assignments ADD COLUMN status TEXT NOT NULL DEFAULT 'pending'
             CHECK(status IN ('pending', 'submitted', 'approved', 'rejected', 'expired', 'granted'));
         ALTER TABLE assignments ADD COLUMN expired_at TEXT;
         ALTER TABLE assignments ADD COLUMN reminder_hours INTEGER;
         ALTER TABLE assignments ADD COLUMN last_reminded_at TEXT;",
    )?;

    // Reward grants have no review workflow.
    tx.execute(
        "UPDATE assignments SET status = 'granted' WHERE kind = 'reward'",
        [],
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (2)", [])?;
    tx.commit()?;
    Ok(())
}

/// Migration v3: point thresholds and sweep indexes.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS point_thresholds (
            id                INTEGER PRIMARY KEY,
            supervisor_id     INTEGER NOT NULL REFERENCES users(user_id),
            assignee_id       INTEGER REFERENCES users(user_id),
            threshold_points  INTEGER NOT NULL,
            punishment_id     INTEGER,
            penalty           INTEGER NOT NULL DEFAULT 10,
            active            INTEGER NOT NULL DEFAULT 1,
            last_triggered_at TEXT,
            created_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_active_deadline
            ON tasks(active, deadline);
        CREATE INDEX IF NOT EXISTS idx_tasks_next_occurrence
            ON tasks(recurrence_enabled, next_occurrence);
        CREATE INDEX IF NOT EXISTS idx_completions_task_status
            ON task_completions(task_id, status);
        CREATE INDEX IF NOT EXISTS idx_assignments_status_deadline
            ON assignments(kind, status, deadline);
        CREATE INDEX IF NOT EXISTS idx_relationships_assignee
            ON relationships(assignee_id);
        CREATE INDEX IF NOT EXISTS idx_thresholds_supervisor
            ON point_thresholds(supervisor_id, active);",
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (3)", [])?;
    tx.commit()?;
    Ok(())
}
