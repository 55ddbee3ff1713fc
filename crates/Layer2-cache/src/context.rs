//! Cache composition point
//!
//! Owns the three named cache instances, the invalidation router and the
//! sweeper. Construct once at startup and pass it to whatever needs caching.

use std::sync::Arc;

use mealdesk_foundation::{CacheSettings, Clock, InstanceConfig, KeyValueStore, Result};
use tracing::info;

use crate::invalidation::{CacheEvent, InvalidationRouter, InvalidationTable};
use crate::query_cache::{CacheStats, QueryCache};
use crate::sweeper::Sweeper;

/// Instance names (also used as durable namespaces)
pub const STATIC_CACHE: &str = "static";
pub const DYNAMIC_CACHE: &str = "dynamic";
pub const USER_CACHE: &str = "user";

/// Application-wide cache context
///
/// ```text
/// ┌───────────────────────────────────────────────┐
/// │                 CacheContext                  │
/// ├───────────────────────────────────────────────┤
/// │  static   (long TTL, durable)                 │
/// │  dynamic  (short TTL, memory only)            │
/// │  user     (medium TTL, durable)               │
/// ├───────────────────────────────────────────────┤
/// │  InvalidationRouter → all three               │
/// │  Sweeper            → all three               │
/// └───────────────────────────────────────────────┘
/// ```
#[derive(Debug)]
pub struct CacheContext {
    settings: CacheSettings,
    static_data: Arc<QueryCache>,
    dynamic_data: Arc<QueryCache>,
    user_data: Arc<QueryCache>,
    router: InvalidationRouter,
    sweeper: Option<Sweeper>,
}

impl CacheContext {
    /// Build all instances; durable ones hydrate from `store`
    pub fn new(
        settings: CacheSettings,
        store: Option<Arc<dyn KeyValueStore>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::with_table(settings, store, clock, InvalidationTable::standard())
    }

    /// Build with a custom invalidation table
    pub fn with_table(
        settings: CacheSettings,
        store: Option<Arc<dyn KeyValueStore>>,
        clock: Arc<dyn Clock>,
        table: InvalidationTable,
    ) -> Result<Self> {
        settings.validate()?;

        let build = |name: &str, config: &InstanceConfig| {
            let durable = store
                .clone()
                .map(|store| (store, settings.storage_prefix.as_str()));
            Arc::new(QueryCache::new(name, config.clone(), durable, clock.clone()))
        };

        let static_data = build(STATIC_CACHE, &settings.static_data);
        let dynamic_data = build(DYNAMIC_CACHE, &settings.dynamic_data);
        let user_data = build(USER_CACHE, &settings.user_data);

        let router = InvalidationRouter::new(
            table,
            vec![static_data.clone(), dynamic_data.clone(), user_data.clone()],
        );

        info!(
            durable_store = store.is_some(),
            static_entries = static_data.len(),
            user_entries = user_data.len(),
            "Cache context ready"
        );

        Ok(Self {
            settings,
            static_data,
            dynamic_data,
            user_data,
            router,
            sweeper: None,
        })
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Long-lived reference data
    pub fn static_data(&self) -> Arc<QueryCache> {
        self.static_data.clone()
    }

    /// Frequently changing data
    pub fn dynamic_data(&self) -> Arc<QueryCache> {
        self.dynamic_data.clone()
    }

    /// Per-user data
    pub fn user_data(&self) -> Arc<QueryCache> {
        self.user_data.clone()
    }

    pub fn caches(&self) -> [&Arc<QueryCache>; 3] {
        [&self.static_data, &self.dynamic_data, &self.user_data]
    }

    pub fn router(&self) -> &InvalidationRouter {
        &self.router
    }

    /// Start the periodic sweep (no-op if already running)
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&mut self) {
        if self.sweeper.as_ref().is_some_and(Sweeper::is_running) {
            return;
        }
        let caches = self.caches().into_iter().cloned().collect();
        self.sweeper = Some(Sweeper::spawn(caches, self.settings.sweep_interval()));
    }

    pub fn is_sweeper_running(&self) -> bool {
        self.sweeper.as_ref().is_some_and(Sweeper::is_running)
    }

    /// Stop background work
    pub fn shutdown(&mut self) {
        if let Some(mut sweeper) = self.sweeper.take() {
            sweeper.shutdown();
        }
    }

    /// Entry point for domain code after a write
    pub fn invalidate_cache(&self, event: &str) -> usize {
        self.router.invalidate_cache(event)
    }

    pub fn invalidate_event(&self, event: CacheEvent) -> usize {
        self.router.invalidate_event(event)
    }

    /// Drop every cached entry (e.g. on logout)
    pub fn clear_all(&self) {
        for cache in self.caches() {
            cache.clear();
        }
        info!("Cleared all caches");
    }

    /// Sweep all instances now
    pub fn sweep_expired(&self) -> usize {
        self.caches().iter().map(|cache| cache.sweep_expired()).sum()
    }

    pub fn stats(&self) -> Vec<CacheStats> {
        self.caches().iter().map(|cache| cache.stats()).collect()
    }
}

impl Drop for CacheContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
