//! SQLite-backed store for hosts without browser storage.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{Store, StoreError, StoreResult};

/// Key-value schema: one row per collection.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Durable store in a single SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT key FROM collections ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>().map_err(Into::into)
    }
}

impl Store for SqliteStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.query_row(
            "SELECT value FROM collections WHERE key = ?",
            [key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            r#"
            INSERT INTO collections (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let store = SqliteStore::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_read_missing() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.read("patients").unwrap(), None);
    }

    #[test]
    fn test_write_replaces_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.write("appointments", "[1]").unwrap();
        store.write("appointments", "[1,2]").unwrap();

        assert_eq!(store.read("appointments").unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(store.keys().unwrap(), vec!["appointments".to_string()]);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dental.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.write("patients", r#"[{"id":"p1"}]"#).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.read("patients").unwrap().as_deref(),
            Some(r#"[{"id":"p1"}]"#)
        );
    }
}
