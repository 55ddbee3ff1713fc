//! Query cache instance
//!
//! One named cache with its own TTL/size/durability policy. All operations are
//! synchronous and infallible for the caller; durable mirroring failures are
//! handled inside [`DurableShadow`]. Durable writes and deletes run while the
//! entry lock is held, so memory and storage change in the same order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mealdesk_foundation::{Clock, InstanceConfig, KeyValueStore};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::entry::CacheEntry;
use crate::key::make_key;
use crate::shadow::DurableShadow;
use crate::store::EntryStore;

/// A named, bounded, TTL-based response cache
///
/// # Example
///
/// ```rust,ignore
/// let cache = QueryCache::new("dynamic", config, None, clock);
///
/// if let Some(meals) = cache.get("getAllMeals", &[]) {
///     return meals;
/// }
/// let meals = fetch_meals().await?;
/// cache.set("getAllMeals", &[], meals.clone(), None);
///
/// // After a write
/// cache.invalidate(&["getAllMeals"]);
/// ```
#[derive(Debug)]
pub struct QueryCache {
    name: String,
    config: InstanceConfig,
    entries: Mutex<EntryStore>,
    shadow: DurableShadow,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Create an instance; durable instances hydrate from `store` immediately
    ///
    /// `store` is ignored unless `config.persist` is set.
    pub fn new(
        name: impl Into<String>,
        config: InstanceConfig,
        durable: Option<(Arc<dyn KeyValueStore>, &str)>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let name = name.into();
        let shadow = match durable {
            Some((store, prefix)) if config.persist => DurableShadow::new(store, prefix, &name),
            _ => DurableShadow::disabled(),
        };

        let cache = Self {
            entries: Mutex::new(EntryStore::new(config.max_entries)),
            name,
            config,
            shadow,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        };
        cache.hydrate();
        cache
    }

    /// In-memory only instance
    pub fn volatile(name: impl Into<String>, config: InstanceConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(name, config, None, clock)
    }

    fn hydrate(&self) {
        if !self.shadow.is_enabled() {
            return;
        }

        let now = self.clock.now_ms();
        let loaded = self.shadow.hydrate(now);
        let count = loaded.len();

        let mut entries = self.entries.lock();
        for (key, entry) in loaded {
            for evicted in entries.insert(key, entry, now) {
                self.shadow.remove(&evicted);
            }
        }
        drop(entries);

        if count > 0 {
            info!(cache = %self.name, entries = count, "Loaded cache entries from durable storage");
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn is_durable(&self) -> bool {
        self.shadow.is_enabled()
    }

    /// Fetch a live entry
    ///
    /// Expired entries are deleted on the way out.
    pub fn get(&self, operation: &str, args: &[Value]) -> Option<Value> {
        let key = make_key(operation, args);
        self.get_by_key(&key)
    }

    pub(crate) fn get_by_key(&self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        let live = match entries.get(key) {
            None => return None,
            Some(entry) if entry.is_live(now) => Some(entry.data.clone()),
            Some(_) => None,
        };

        match live {
            Some(data) => {
                drop(entries);
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache = %self.name, key, "Cache hit");
                Some(data)
            }
            None => {
                entries.remove(key);
                self.shadow.remove(key);
                drop(entries);
                debug!(cache = %self.name, key, "Cache entry expired");
                None
            }
        }
    }

    /// Store a value; `ttl` overrides the instance default
    pub fn set(&self, operation: &str, args: &[Value], data: Value, ttl: Option<Duration>) {
        let key = make_key(operation, args);
        self.set_by_key(key, data, ttl);
    }

    /// Serialize and store any value
    pub fn set_serialized<T: Serialize>(
        &self,
        operation: &str,
        args: &[Value],
        data: &T,
        ttl: Option<Duration>,
    ) -> mealdesk_foundation::Result<()> {
        let value = serde_json::to_value(data)?;
        self.set(operation, args, value, ttl);
        Ok(())
    }

    pub(crate) fn set_by_key(&self, key: String, data: Value, ttl: Option<Duration>) {
        let now = self.clock.now_ms();
        let entry = CacheEntry::new(data, now, ttl.unwrap_or_else(|| self.config.ttl()));

        let mut entries = self.entries.lock();
        let evicted = entries.insert(key.clone(), entry.clone(), now);

        for evicted_key in &evicted {
            debug!(cache = %self.name, key = %evicted_key, "Evicted cache entry");
            self.shadow.remove(evicted_key);
        }
        self.shadow.persist(&key, &entry);
    }

    /// Whether a live entry exists (no stats, no recency update)
    pub fn contains(&self, operation: &str, args: &[Value]) -> bool {
        let key = make_key(operation, args);
        let now = self.clock.now_ms();
        self.entries
            .lock()
            .peek(&key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Delete a single entry
    pub fn remove(&self, operation: &str, args: &[Value]) -> bool {
        let key = make_key(operation, args);
        let mut entries = self.entries.lock();
        let removed = entries.remove(&key).is_some();
        self.shadow.remove(&key);
        removed
    }

    /// Delete every entry whose key contains any of `patterns`
    ///
    /// Returns the number of in-memory entries removed.
    pub fn invalidate(&self, patterns: &[&str]) -> usize {
        if patterns.is_empty() {
            return 0;
        }

        let mut entries = self.entries.lock();
        let removed = entries.remove_matching(patterns);
        let durable = self.shadow.remove_matching(patterns);
        drop(entries);

        if !removed.is_empty() || durable > 0 {
            debug!(
                cache = %self.name,
                ?patterns,
                removed = removed.len(),
                durable,
                "Invalidated cache entries"
            );
        }
        removed.len()
    }

    /// Drop everything, in memory and durable
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.shadow.clear();
        drop(entries);
        debug!(cache = %self.name, "Cleared cache");
    }

    /// Remove every expired entry
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let removed = entries.remove_expired(now);
        for key in &removed {
            self.shadow.remove(key);
        }
        drop(entries);
        if !removed.is_empty() {
            debug!(cache = %self.name, removed = removed.len(), "Swept expired cache entries");
        }
        removed.len()
    }

    /// Record a miss signal for `key` (used by the wrapper after fetching)
    pub fn record_miss(&self, key: &str, elapsed: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(
            cache = %self.name,
            key,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cache miss"
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Read-only snapshot of the instance
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let entries = self.entries.lock();

        let mut per_entry: Vec<EntryStats> = entries
            .iter()
            .map(|(key, entry)| EntryStats {
                key: key.clone(),
                age_ms: entry.age_ms(now),
                ttl_ms: entry.ttl,
                is_expired: entry.is_expired(now),
            })
            .collect();
        per_entry.sort_by(|a, b| a.key.cmp(&b.key));

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            name: self.name.clone(),
            size: entries.len(),
            max_size: entries.capacity(),
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            entries: per_entry,
        }
    }
}

/// Instance statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub name: String,
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: Vec<EntryStats>,
}

/// Per-entry statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStats {
    pub key: String,
    pub age_ms: u64,
    pub ttl_ms: u64,
    pub is_expired: bool,
}
