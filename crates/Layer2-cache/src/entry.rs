//! Cache entry

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A cached payload with its creation time and lifetime
///
/// The serialized form is what the durable shadow stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cached result, opaque to the cache
    pub data: Value,
    /// Creation time (epoch ms)
    pub timestamp: i64,
    /// Lifetime (ms)
    pub ttl: u64,
}

impl CacheEntry {
    pub fn new(data: Value, now_ms: i64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: now_ms,
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Last instant at which the entry is still live
    ///
    /// Saturates, so a huge TTL means "never expires".
    pub fn expires_at(&self) -> i64 {
        self.timestamp
            .saturating_add(i64::try_from(self.ttl).unwrap_or(i64::MAX))
    }

    /// Live iff `now <= timestamp + ttl`
    pub fn is_live(&self, now_ms: i64) -> bool {
        now_ms <= self.expires_at()
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        !self.is_live(now_ms)
    }

    pub fn age_ms(&self, now_ms: i64) -> u64 {
        now_ms.saturating_sub(self.timestamp).max(0) as u64
    }
}
