//! v001 -- Initial schema creation.
//!
//! Creates the `slots` table holding one JSON snapshot per named slot.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Snapshot slots
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS slots (
    name       TEXT PRIMARY KEY NOT NULL,   -- e.g. 'auth-storage', 'chat-storage'
    json       TEXT NOT NULL,               -- serialized snapshot
    updated_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
