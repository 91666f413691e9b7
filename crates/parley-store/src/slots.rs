//! Named snapshot slots.
//!
//! Each slot holds one JSON document that is replaced wholesale on every
//! write.  There is no versioning of the payload itself.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Serialize `value` and overwrite the slot called `name`.
    pub fn put_slot<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Snapshot {
            slot: name.to_string(),
            source,
        })?;

        self.conn().execute(
            "INSERT INTO slots (name, json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET json = excluded.json, updated_at = excluded.updated_at",
            params![name, json, Utc::now().to_rfc3339()],
        )?;

        tracing::trace!(slot = name, bytes = json.len(), "snapshot written");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Load and decode the slot called `name`, or `None` if it was never
    /// written.
    pub fn get_slot<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT json FROM slots WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|raw| {
            serde_json::from_str(&raw).map_err(|source| StoreError::Snapshot {
                slot: name.to_string(),
                source,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Counter {
        count: u32,
        label: String,
    }

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("slots.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn missing_slot_reads_as_none() {
        let (_dir, db) = open();
        let got: Option<Counter> = db.get_slot("nothing").unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn put_overwrites_previous_snapshot() {
        let (_dir, db) = open();
        db.put_slot("counter", &Counter { count: 1, label: "a".into() }).unwrap();
        db.put_slot("counter", &Counter { count: 2, label: "b".into() }).unwrap();

        let got: Counter = db.get_slot("counter").unwrap().unwrap();
        assert_eq!(got, Counter { count: 2, label: "b".into() });
    }

    #[test]
    fn slots_are_independent() {
        let (_dir, db) = open();
        db.put_slot("one", &Counter { count: 1, label: "x".into() }).unwrap();
        db.put_slot("two", &Counter { count: 2, label: "y".into() }).unwrap();

        db.put_slot("one", &Counter { count: 3, label: "z".into() }).unwrap();

        let one: Counter = db.get_slot("one").unwrap().unwrap();
        let two: Counter = db.get_slot("two").unwrap().unwrap();
        assert_eq!(one.count, 3);
        assert_eq!(two, Counter { count: 2, label: "y".into() });
    }

    #[test]
    fn corrupt_snapshot_reports_slot_name() {
        let (_dir, db) = open();
        db.conn()
            .execute(
                "INSERT INTO slots (name, json, updated_at) VALUES ('bad', '{oops', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        let err = db.get_slot::<Counter>("bad").unwrap_err();
        assert!(matches!(err, StoreError::Snapshot { ref slot, .. } if slot == "bad"));
    }
}
