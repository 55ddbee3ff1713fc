//! # mealdesk-foundation
//!
//! Foundation layer for Mealdesk:
//! - Error: central error type
//! - Clock: wall-clock time source (system + manual for tests)
//! - Storage: durable key-value stores (memory, SQLite) and JSON config files
//! - Config: cache settings (per-instance policy, sweeper interval)
//! - Telemetry: tracing subscriber setup
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  mealdesk-cache (Layer 2)                               │
//! │  QueryCache ── DurableShadow ── InvalidationRouter      │
//! │                     │                                   │
//! │                     ▼                                   │
//! │          KeyValueStore (trait)                          │
//! │          ┌─────────┴─────────┐                         │
//! │          ▼                   ▼                         │
//! │     MemoryStore         SqliteStore                    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod storage;
pub mod telemetry;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Clock
// ============================================================================
pub use clock::{Clock, ManualClock, SystemClock};

// ============================================================================
// Config
// ============================================================================
pub use config::{CacheSettings, InstanceConfig, CACHE_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{JsonStore, KeyValueStore, MemoryStore, SqliteStore, CONFIG_DIR_NAME};

// ============================================================================
// Telemetry
// ============================================================================
pub use telemetry::init_tracing;
