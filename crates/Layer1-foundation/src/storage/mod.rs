//! Storage module for Mealdesk
//!
//! - `kv`: durable key-value store trait + in-memory implementation
//! - `sqlite`: SQLite-backed key-value store
//! - `json`: JSON configuration files

mod json;
mod kv;
mod sqlite;

// Key-value stores (cache shadowing)
pub use kv::{KeyValueStore, MemoryStore};
pub use sqlite::SqliteStore;

// JSON files (configuration)
pub use json::{JsonStore, CONFIG_DIR_NAME};
