//! Config - cache settings
//!
//! - `cache.rs` - per-instance TTL/size/durability policy and sweeper interval

mod cache;

pub use cache::{CacheSettings, InstanceConfig, CACHE_CONFIG_FILE};
