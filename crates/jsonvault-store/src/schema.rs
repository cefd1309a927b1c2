//! Table, index, and view definitions.
//!
//! `history.entry_id` references `entries.id` with `ON DELETE CASCADE`, so a
//! history row can never outlive its entry once the delete commits.

use rusqlite::Connection;

use crate::error::StoreResult;

const CREATE_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT,
      document TEXT NOT NULL CHECK (json_valid(document)),
      created_at_ms INTEGER NOT NULL,
      updated_at_ms INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at_ms);
    CREATE INDEX IF NOT EXISTS idx_entries_name ON entries(name);

    CREATE TABLE IF NOT EXISTS history (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
      action TEXT NOT NULL CHECK (action IN ('CREATE', 'UPDATE', 'DELETE')),
      before_document TEXT,
      after_document TEXT,
      changes TEXT,
      created_at_ms INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_history_entry_id ON history(entry_id);
    CREATE INDEX IF NOT EXISTS idx_history_created_at ON history(created_at_ms);

    DROP VIEW IF EXISTS history_view;
    CREATE VIEW history_view AS
    SELECT
      h.id,
      h.entry_id,
      e.name AS entry_name,
      h.action,
      h.before_document,
      h.after_document,
      h.changes,
      h.created_at_ms
    FROM history h
    JOIN entries e ON h.entry_id = e.id;
"#;

/// Create tables, indexes, and the history view. Safe to run repeatedly.
pub fn create_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(&format!("BEGIN;\n{CREATE_TABLES}\nCOMMIT;"))?;
    Ok(())
}

/// Returns `true` when both tables and the view exist.
pub fn schema_present(conn: &Connection) -> StoreResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE (type = 'table' AND name IN ('entries', 'history'))
            OR (type = 'view' AND name = 'history_view')",
        [],
        |row| row.get(0),
    )?;
    Ok(count == 3)
}
