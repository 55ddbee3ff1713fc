//! Durable shadow
//!
//! Mirrors entries of one cache instance into a [`KeyValueStore`] under the
//! namespace `prefix + instance + ":"`. Every operation is best-effort: store
//! and serialization failures are logged and swallowed, so the in-memory cache
//! keeps working when storage is full or disabled.

use std::sync::Arc;

use mealdesk_foundation::{Error, KeyValueStore};
use tracing::{debug, error, warn};

use crate::entry::CacheEntry;

/// Best-effort persistent mirror of a cache instance
#[derive(Clone)]
pub struct DurableShadow {
    store: Option<Arc<dyn KeyValueStore>>,
    namespace: String,
}

impl std::fmt::Debug for DurableShadow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableShadow")
            .field("namespace", &self.namespace)
            .field("enabled", &self.store.is_some())
            .finish()
    }
}

impl DurableShadow {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: &str, instance: &str) -> Self {
        Self {
            store: Some(store),
            namespace: format!("{}{}:", prefix, instance),
        }
    }

    /// Shadow that does nothing
    pub fn disabled() -> Self {
        Self {
            store: None,
            namespace: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Load live entries, oldest first; expired and malformed ones are deleted
    pub fn hydrate(&self, now_ms: i64) -> Vec<(String, CacheEntry)> {
        let Some(store) = &self.store else {
            return Vec::new();
        };

        let keys = match store.keys_with_prefix(&self.namespace) {
            Ok(keys) => keys,
            Err(e) => {
                log_failure("hydrate", &self.namespace, &e);
                return Vec::new();
            }
        };

        let mut live = Vec::new();
        let mut dropped = 0usize;
        for storage_key in keys {
            let cache_key = storage_key[self.namespace.len()..].to_string();

            let parsed = match store.get_item(&storage_key) {
                Ok(Some(raw)) => serde_json::from_str::<CacheEntry>(&raw).ok(),
                Ok(None) => continue,
                Err(e) => {
                    log_failure("read", &storage_key, &e);
                    continue;
                }
            };

            match parsed {
                Some(entry) if entry.is_live(now_ms) => live.push((cache_key, entry)),
                _ => {
                    dropped += 1;
                    self.remove_storage_key(&storage_key);
                }
            }
        }

        live.sort_by_key(|(_, entry)| entry.timestamp);
        debug!(
            namespace = %self.namespace,
            loaded = live.len(),
            dropped,
            "Hydrated durable cache"
        );
        live
    }

    /// Write an entry
    pub fn persist(&self, key: &str, entry: &CacheEntry) {
        let Some(store) = &self.store else {
            return;
        };

        let encoded = match serde_json::to_string(entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = store.set_item(&self.storage_key(key), &encoded) {
            log_failure("persist", key, &e);
        }
    }

    /// Delete one entry
    pub fn remove(&self, key: &str) {
        if self.store.is_some() {
            self.remove_storage_key(&self.storage_key(key));
        }
    }

    /// Delete every namespaced entry whose cache key contains any pattern
    ///
    /// Works on the store's own key listing so entries written by an earlier
    /// process are purged too.
    pub fn remove_matching(&self, patterns: &[&str]) -> usize {
        self.remove_namespaced(|cache_key| patterns.iter().any(|p| cache_key.contains(p)))
    }

    /// Delete every entry in the namespace
    pub fn clear(&self) -> usize {
        self.remove_namespaced(|_| true)
    }

    fn remove_namespaced<F>(&self, matches: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let Some(store) = &self.store else {
            return 0;
        };

        let keys = match store.keys_with_prefix(&self.namespace) {
            Ok(keys) => keys,
            Err(e) => {
                log_failure("list", &self.namespace, &e);
                return 0;
            }
        };

        let mut removed = 0;
        for storage_key in keys {
            if matches(&storage_key[self.namespace.len()..]) {
                self.remove_storage_key(&storage_key);
                removed += 1;
            }
        }
        removed
    }

    fn remove_storage_key(&self, storage_key: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove_item(storage_key) {
                log_failure("remove", storage_key, &e);
            }
        }
    }
}

/// Storage failures are expected (quota, disabled storage) and logged at
/// `warn`; anything else points at a bug and is logged at `error`.
fn log_failure(action: &str, key: &str, err: &Error) {
    if err.is_storage_failure() {
        warn!(key, error = %err, "Durable cache {} failed", action);
    } else {
        error!(key, error = %err, "Unexpected durable cache error during {}", action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealdesk_foundation::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    fn shadow(store: &Arc<MemoryStore>) -> DurableShadow {
        DurableShadow::new(store.clone(), "test:", "static")
    }

    #[test]
    fn test_persist_and_hydrate() {
        let store = Arc::new(MemoryStore::new());
        let shadow = shadow(&store);

        shadow.persist("b:", &CacheEntry::new(json!(2), 200, Duration::from_secs(10)));
        shadow.persist("a:", &CacheEntry::new(json!(1), 100, Duration::from_secs(10)));

        let loaded = shadow.hydrate(300);
        let keys: Vec<_> = loaded.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a:", "b:"]);
        assert!(store.get_item("test:static:a:").unwrap().is_some());
    }

    #[test]
    fn test_hydrate_drops_expired_and_malformed() {
        let store = Arc::new(MemoryStore::new());
        let shadow = shadow(&store);

        shadow.persist("old:", &CacheEntry::new(json!(1), 0, Duration::from_millis(5)));
        store.set_item("test:static:junk:", "{not json").unwrap();
        store.set_item("unrelated", "keep").unwrap();

        assert!(shadow.hydrate(100).is_empty());
        assert_eq!(store.keys().unwrap(), vec!["unrelated"]);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        let static_shadow = DurableShadow::new(store.clone(), "test:", "static");
        let user_shadow = DurableShadow::new(store.clone(), "test:", "user");

        static_shadow.persist("k:", &CacheEntry::new(json!(1), 0, Duration::from_secs(1)));
        assert!(user_shadow.hydrate(0).is_empty());
        assert_eq!(user_shadow.clear(), 0);
        assert_eq!(static_shadow.hydrate(0).len(), 1);
    }

    #[test]
    fn test_remove_matching() {
        let store = Arc::new(MemoryStore::new());
        let shadow = shadow(&store);
        let e = CacheEntry::new(json!(1), 0, Duration::from_secs(1));
        shadow.persist("getAllMeals:", &e);
        shadow.persist("getMealById:[5]", &e);

        assert_eq!(shadow.remove_matching(&["getAllMeals"]), 1);
        assert_eq!(store.keys().unwrap(), vec!["test:static:getMealById:[5]"]);
    }

    #[test]
    fn test_failing_store_is_silent() {
        let shadow = DurableShadow::new(Arc::new(MemoryStore::unavailable()), "test:", "user");
        let e = CacheEntry::new(json!(1), 0, Duration::from_secs(1));

        shadow.persist("k:", &e);
        shadow.remove("k:");
        assert_eq!(shadow.remove_matching(&["k"]), 0);
        assert_eq!(shadow.clear(), 0);
        assert!(shadow.hydrate(0).is_empty());
    }

    /// Store that fails with non-storage errors
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get_item(&self, _key: &str) -> mealdesk_foundation::Result<Option<String>> {
            Err(Error::Internal("broken".into()))
        }
        fn set_item(&self, _key: &str, _value: &str) -> mealdesk_foundation::Result<()> {
            Err(Error::Internal("broken".into()))
        }
        fn remove_item(&self, _key: &str) -> mealdesk_foundation::Result<()> {
            Err(Error::Internal("broken".into()))
        }
        fn keys(&self) -> mealdesk_foundation::Result<Vec<String>> {
            Err(Error::Internal("broken".into()))
        }
    }

    #[test]
    fn test_unexpected_errors_are_also_swallowed() {
        assert!(!Error::Internal("broken".into()).is_storage_failure());

        let shadow = DurableShadow::new(Arc::new(BrokenStore), "test:", "static");
        let e = CacheEntry::new(json!(1), 0, Duration::from_secs(1));
        shadow.persist("k:", &e);
        shadow.remove("k:");
        assert_eq!(shadow.clear(), 0);
        assert!(shadow.hydrate(0).is_empty());
    }

    #[test]
    fn test_disabled_is_noop() {
        let shadow = DurableShadow::disabled();
        assert!(!shadow.is_enabled());
        shadow.persist("k:", &CacheEntry::new(json!(1), 0, Duration::from_secs(1)));
        assert!(shadow.hydrate(0).is_empty());
    }
}
