//! In-memory store with an optional size quota.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{Store, StoreError, StoreResult};

/// Volatile store. With a quota it refuses writes that would push the total
/// stored size past the limit, the way browser storage does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding at most `quota_bytes` of keys and values.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently stored, keys included.
    pub fn used_bytes(&self) -> StoreResult<usize> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.iter().map(|(k, v)| k.len() + v.len()).sum())
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write() {
        let store = MemoryStore::new();
        assert_eq!(store.read("patients").unwrap(), None);

        store.write("patients", "[]").unwrap();
        assert_eq!(store.read("patients").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.used_bytes().unwrap(), "patients".len() + 2);
    }

    #[test]
    fn test_quota_rejects_and_keeps_previous_value() {
        let store = MemoryStore::with_quota(16);
        store.write("k", "[1]").unwrap();

        let err = store.write("k", "[1,2,3,4,5,6,7,8]").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { needed: 18, quota: 16, .. }));
        assert_eq!(store.read("k").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_quota_counts_replaced_slot_once() {
        let store = MemoryStore::with_quota(10);
        store.write("k", "123456789").unwrap();
        // Replacing the same slot does not double count the old value
        store.write("k", "987654321").unwrap();
    }
}
