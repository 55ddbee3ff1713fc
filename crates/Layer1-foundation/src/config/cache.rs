//! Cache configuration
//!
//! Three named cache instances differ only in TTL, size and durability:
//! - `static_data`: long TTL, durable (reference data such as categories)
//! - `dynamic_data`: short TTL, volatile (lists that change often)
//! - `user_data`: medium TTL, durable (per-user data)

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Cache configuration file name
pub const CACHE_CONFIG_FILE: &str = "cache.json";

/// Policy for one cache instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    /// TTL applied when `set` gets no override (milliseconds)
    pub default_ttl_ms: u64,

    /// Maximum resident entries
    pub max_entries: usize,

    /// Mirror entries to the durable store
    #[serde(default)]
    pub persist: bool,
}

impl InstanceConfig {
    pub fn new(default_ttl: Duration, max_entries: usize, persist: bool) -> Self {
        Self {
            default_ttl_ms: default_ttl.as_millis() as u64,
            max_entries,
            persist,
        }
    }

    /// Default TTL as Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

/// Settings for every cache instance plus the sweeper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    /// Near-static reference data
    #[serde(default = "default_static_data")]
    pub static_data: InstanceConfig,

    /// Frequently changing data
    #[serde(default = "default_dynamic_data")]
    pub dynamic_data: InstanceConfig,

    /// Per-user data
    #[serde(default = "default_user_data")]
    pub user_data: InstanceConfig,

    /// Interval between expiration sweeps (milliseconds)
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Namespace prefix for durable keys
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
}

// Default value functions
fn default_static_data() -> InstanceConfig {
    InstanceConfig::new(Duration::from_secs(30 * 60), 50, true)
}
fn default_dynamic_data() -> InstanceConfig {
    InstanceConfig::new(Duration::from_secs(2 * 60), 100, false)
}
fn default_user_data() -> InstanceConfig {
    InstanceConfig::new(Duration::from_secs(10 * 60), 50, true)
}
fn default_sweep_interval_ms() -> u64 {
    60_000
}
fn default_storage_prefix() -> String {
    "mealdesk_cache:".to_string()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            static_data: default_static_data(),
            dynamic_data: default_dynamic_data(),
            user_data: default_user_data(),
            sweep_interval_ms: default_sweep_interval_ms(),
            storage_prefix: default_storage_prefix(),
        }
    }
}

impl CacheSettings {
    /// Small footprint for constrained clients
    pub fn minimal() -> Self {
        Self {
            static_data: InstanceConfig::new(Duration::from_secs(15 * 60), 20, true),
            dynamic_data: InstanceConfig::new(Duration::from_secs(60), 30, false),
            user_data: InstanceConfig::new(Duration::from_secs(5 * 60), 20, false),
            ..Default::default()
        }
    }

    /// Aggressive caching
    pub fn performance() -> Self {
        Self {
            static_data: InstanceConfig::new(Duration::from_secs(60 * 60), 200, true),
            dynamic_data: InstanceConfig::new(Duration::from_secs(5 * 60), 500, false),
            user_data: InstanceConfig::new(Duration::from_secs(30 * 60), 200, true),
            ..Default::default()
        }
    }

    /// Sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Check invariants
    pub fn validate(&self) -> Result<()> {
        for (name, instance) in [
            ("staticData", &self.static_data),
            ("dynamicData", &self.dynamic_data),
            ("userData", &self.user_data),
        ] {
            if instance.max_entries == 0 {
                return Err(Error::Config(format!("{}.maxEntries must be > 0", name)));
            }
        }
        if self.sweep_interval_ms == 0 {
            return Err(Error::Config("sweepIntervalMs must be > 0".to_string()));
        }
        if self.storage_prefix.is_empty() {
            return Err(Error::Config("storagePrefix must not be empty".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// Global + project, merged and validated
    pub fn load() -> Result<Self> {
        let global = JsonStore::global().ok();
        let project = JsonStore::current_project().ok();
        Self::load_layered(global.as_ref(), project.as_ref())
    }

    /// Merge the given layers in order; later layers win field by field
    pub fn load_layered(global: Option<&JsonStore>, project: Option<&JsonStore>) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        for store in [global, project].into_iter().flatten() {
            if let Some(layer) = store.load_optional::<Value>(CACHE_CONFIG_FILE)? {
                merge_json(&mut merged, layer);
            }
        }

        let settings: Self = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("Invalid cache settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save to a store
    pub fn save(&self, store: &JsonStore) -> Result<()> {
        store.save(CACHE_CONFIG_FILE, self)
    }
}

/// Recursive object merge; non-object values replace
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
