//! Error types for Mealdesk
//!
//! Every fallible foundation operation reports through this enum.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Mealdesk error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Storage
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage quota exceeded: {used} + {requested} bytes > {quota} bytes")]
    QuotaExceeded {
        used: usize,
        requested: usize,
        quota: usize,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // ========================================================================
    // Other
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error came from a durable store (and may be skipped)
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Error::Storage(_)
                | Error::QuotaExceeded { .. }
                | Error::Unavailable(_)
                | Error::Io(_)
                | Error::Sqlite(_)
        )
    }

    /// Quota error helper
    pub fn quota_exceeded(used: usize, requested: usize, quota: usize) -> Self {
        Error::QuotaExceeded {
            used,
            requested,
            quota,
        }
    }
}

// ============================================================================
// From conversions
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
