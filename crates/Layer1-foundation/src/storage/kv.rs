//! Durable key-value store abstraction
//!
//! The cache mirrors entries into any `KeyValueStore`. Stores are synchronous,
//! string-keyed and may reject writes (quota) or be entirely unavailable.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// A persistent string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value (missing keys are not an error)
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Enumerate every stored key
    fn keys(&self) -> Result<Vec<String>>;

    /// Enumerate keys starting with `prefix`
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

/// In-memory store with an optional byte quota
///
/// Usage is counted as `key.len() + value.len()` per item.
#[derive(Debug)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
    available: bool,
}

impl MemoryStore {
    /// Unbounded store
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            quota_bytes: None,
            available: true,
        }
    }

    /// Store that rejects writes pushing usage above `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    /// Store whose every operation fails, as when storage is disabled
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Current usage in bytes
    pub fn used_bytes(&self) -> usize {
        self.items
            .lock()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(Error::Unavailable("memory store disabled".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.check_available()?;
        let mut items = self.items.lock();

        if let Some(quota) = self.quota_bytes {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let requested = key.len() + value.len();
            if used + requested > quota {
                return Err(Error::quota_exceeded(used, requested, quota));
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.check_available()?;
        self.items.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self.items.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();

        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);

        store.remove_item("a").unwrap();
        store.remove_item("missing").unwrap();
        assert!(store.get_item("a").unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(10);
        store.set_item("k", "12345").unwrap(); // 6 bytes

        let err = store.set_item("j", "12345").unwrap_err(); // +6 > 10
        assert!(matches!(err, Error::QuotaExceeded { .. }));

        // Overwriting the same key only counts the new value
        store.set_item("k", "123456789").unwrap();
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn test_unavailable_store_fails_everything() {
        let store = MemoryStore::unavailable();
        assert!(store.get_item("a").is_err());
        assert!(store.set_item("a", "1").is_err());
        assert!(store.remove_item("a").is_err());
        assert!(store.keys().is_err());
    }

    #[test]
    fn test_keys_with_prefix() {
        let store = MemoryStore::new();
        store.set_item("cache:static:x", "1").unwrap();
        store.set_item("cache:user:y", "2").unwrap();
        store.set_item("other", "3").unwrap();

        assert_eq!(
            store.keys_with_prefix("cache:static:").unwrap(),
            vec!["cache:static:x"]
        );
    }
}
