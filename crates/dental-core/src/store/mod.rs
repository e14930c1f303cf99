//! Persistent store adapter.
//!
//! A store is a set of named string slots, the same shape as browser local
//! storage. Each collection (`patients`, `appointments`) lives in one slot as
//! a JSON array and is always rewritten as a whole.

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Slot holding the patient collection.
pub const PATIENTS_KEY: &str = "patients";

/// Slot holding the appointment collection.
pub const APPOINTMENTS_KEY: &str = "appointments";

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raw key-value backend.
pub trait Store: Send + Sync {
    /// Read a slot. `Ok(None)` when the key was never written.
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Overwrite a slot entirely.
    fn write(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// Load a collection.
///
/// Never fails: a missing slot, an unreadable backend or a value that is not
/// a JSON array all yield an empty collection. Records are decoded one by
/// one, so a single record that does not fit the model is skipped and the
/// rest of the collection survives.
pub fn load<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Vec<T> {
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!(key, "collection not stored yet");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read collection, starting empty");
            return Vec::new();
        }
    };

    let values = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(key, error = %e, "stored collection is malformed, starting empty");
            return Vec::new();
        }
    };

    let stored = values.len();
    let records: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(key, index, error = %e, "skipping unreadable record");
                None
            }
        })
        .collect();
    tracing::debug!(
        key,
        count = records.len(),
        skipped = stored - records.len(),
        "loaded collection"
    );
    records
}

/// Save a whole collection, replacing whatever the slot held.
pub fn save<T: Serialize>(store: &dyn Store, key: &str, records: &[T]) -> StoreResult<()> {
    let raw = serde_json::to_string(records)?;
    store.write(key, &raw)?;
    tracing::debug!(key, count = records.len(), bytes = raw.len(), "saved collection");
    Ok(())
}

/// The result of a mutation together with the outcome of persisting it.
///
/// A failed write does not undo the in-memory change; the failure is carried
/// here so the caller can warn the user.
#[derive(Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub warning: Option<StoreError>,
}

impl<T> Persisted<T> {
    /// Wrap a value with the result of saving it, logging a failed write.
    pub(crate) fn from_save(value: T, key: &str, result: StoreResult<()>) -> Self {
        let warning = match result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "write failed, keeping in-memory state");
                Some(e)
            }
        };
        Self { value, warning }
    }

    /// Whether the change reached the store.
    pub fn is_durable(&self) -> bool {
        self.warning.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, serde::Deserialize, PartialEq)]
    struct Row {
        id: String,
        n: u32,
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let rows = vec![
            Row { id: "a".into(), n: 1 },
            Row { id: "b".into(), n: 2 },
        ];
        save(&store, "rows", &rows).unwrap();
        let loaded: Vec<Row> = load(&store, "rows");
        assert_eq!(loaded, rows);
    }

    #[test]
    fn test_load_missing_key_is_empty() {
        let store = MemoryStore::new();
        let loaded: Vec<Row> = load(&store, "never-written");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_corrupt_value_is_empty() {
        let store = MemoryStore::new();
        store.write("rows", "{not json").unwrap();
        let loaded: Vec<Row> = load(&store, "rows");
        assert!(loaded.is_empty());

        // Valid JSON of the wrong shape degrades the same way
        store.write("rows", r#"{"id":"a"}"#).unwrap();
        let loaded: Vec<Row> = load(&store, "rows");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_skips_only_unreadable_records() {
        let store = MemoryStore::new();
        store
            .write("rows", r#"[{"id":"a","n":1},{"id":"b","n":"two"},{"id":"c","n":3}]"#)
            .unwrap();
        let loaded: Vec<Row> = load(&store, "rows");
        assert_eq!(
            loaded,
            vec![Row { id: "a".into(), n: 1 }, Row { id: "c".into(), n: 3 }]
        );
    }

    #[test]
    fn test_save_overwrites() {
        let store = MemoryStore::new();
        save(&store, "rows", &[Row { id: "a".into(), n: 1 }]).unwrap();
        save::<Row>(&store, "rows", &[]).unwrap();
        assert_eq!(store.read("rows").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_persisted_carries_warning() {
        let ok = Persisted::from_save(1, "rows", Ok(()));
        assert!(ok.is_durable());

        let failed = Persisted::from_save(2, "rows", Err(StoreError::Poisoned));
        assert!(!failed.is_durable());
        assert_eq!(failed.into_value(), 2);
    }
}
