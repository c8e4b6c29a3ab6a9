//! Gap-filling id allocation for user-visible entities.
//!
//! Visible numeric ids (tasks, catalog entries, completions, assignments,
//! thresholds) reuse the lowest unused integer so ids stay small after
//! deletions. The lookup rides the primary-key index instead of scanning
//! existing rows in application code.

use rusqlite::Connection;

/// Return the lowest unused id (>= 1) for `table`.
///
/// The caller holds the store lock, so allocate-then-insert is race-free.
pub(crate) fn first_free_id(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    // Table names are internal constants, never user input.
    let sql = format!(
        "SELECT CASE
             WHEN NOT EXISTS (SELECT 1 FROM {table} WHERE id = 1) THEN 1
             ELSE (SELECT MIN(a.id) + 1 FROM {table} a
                   WHERE NOT EXISTS (SELECT 1 FROM {table} b WHERE b.id = a.id + 1))
         END"
    );
    conn.query_row(&sql, [], |row| row.get(0))
}
