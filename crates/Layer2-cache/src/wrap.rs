//! Cache-wrapping decorator
//!
//! Wraps an async operation so calls check the cache first and store
//! successful results afterwards. A result is cached only when its JSON form
//! is an object with `"success": true`; anything else passes through
//! uncached. Errors from the operation propagate unchanged.
//!
//! Concurrent misses for the same key are not coalesced: each caller invokes
//! the operation.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::key::make_key;
use crate::query_cache::QueryCache;

/// Whether a result reports success (`{"success": true, ...}`)
pub fn is_success(value: &Value) -> bool {
    matches!(value.get("success"), Some(Value::Bool(true)))
}

/// Wrap `operation` with `cache` under `name`
///
/// # Example
///
/// ```rust,ignore
/// let get_meal = with_cache(ctx.dynamic_data(), "getMealById", |args| async move {
///     api.get_meal(&args[0]).await
/// }, None);
///
/// let response = get_meal.call(vec![json!(5)]).await?;
/// ```
pub fn with_cache<F, Fut, R, E>(
    cache: Arc<QueryCache>,
    name: impl Into<String>,
    operation: F,
    ttl: Option<Duration>,
) -> CachedOperation<F>
where
    F: Fn(Vec<Value>) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    CachedOperation {
        cache,
        name: name.into(),
        operation,
        ttl,
    }
}

/// An async operation memoized through a [`QueryCache`]
pub struct CachedOperation<F> {
    cache: Arc<QueryCache>,
    name: String,
    operation: F,
    ttl: Option<Duration>,
}

impl<F> std::fmt::Debug for CachedOperation<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedOperation")
            .field("cache", &self.cache.name())
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<F> CachedOperation<F> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Invoke through the cache
    pub async fn call<Fut, R, E>(&self, args: Vec<Value>) -> Result<R, E>
    where
        F: Fn(Vec<Value>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        R: Serialize + DeserializeOwned,
    {
        let key = make_key(&self.name, &args);

        if let Some(cached) = self.cache.get_by_key(&key) {
            match serde_json::from_value::<R>(cached) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(cache = %self.cache.name(), key = %key, error = %e, "Cached value has unexpected shape, refetching");
                }
            }
        }

        let started = Instant::now();
        let result = (self.operation)(args).await;
        self.cache.record_miss(&key, started.elapsed());

        if let Ok(value) = &result {
            match serde_json::to_value(value) {
                Ok(encoded) if is_success(&encoded) => {
                    self.cache.set_by_key(key, encoded, self.ttl);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(cache = %self.cache.name(), key = %key, error = %e, "Result not serializable, skipping cache");
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealdesk_foundation::{InstanceConfig, ManualClock};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Response {
        success: bool,
        value: i64,
    }

    fn cache() -> (Arc<QueryCache>, ManualClock) {
        let clock = ManualClock::default();
        let config = InstanceConfig::new(Duration::from_secs(60), 10, false);
        (
            Arc::new(QueryCache::volatile("dynamic", config, Arc::new(clock.clone()))),
            clock,
        )
    }

    #[test]
    fn test_is_success() {
        assert!(is_success(&json!({"success": true, "data": 1})));
        assert!(!is_success(&json!({"success": false})));
        assert!(!is_success(&json!({"success": "true"})));
        assert!(!is_success(&json!({"data": 1})));
        assert!(!is_success(&json!([true])));
        assert!(!is_success(&json!(42)));
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let (cache, _) = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let op = with_cache(
            cache.clone(),
            "getAnswer",
            move |_args| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(Response {
                        success: true,
                        value: 42,
                    })
                }
            },
            None,
        );

        let first = op.call(vec![json!(1)]).await.unwrap();
        let second = op.call(vec![json!(1)]).await.unwrap();
        assert_eq!(first, Response { success: true, value: 42 });
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Different arguments miss
        op.call(vec![json!(2)]).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn test_error_passthrough_caches_nothing() {
        let (cache, _) = cache();
        let op = with_cache(
            cache.clone(),
            "getBroken",
            |_args| async { Err::<Response, _>("backend down".to_string()) },
            None,
        );

        let err = op.call(vec![]).await.unwrap_err();
        assert_eq!(err, "backend down");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unsuccessful_result_not_cached() {
        let (cache, _) = cache();
        let op = with_cache(
            cache.clone(),
            "getMeal",
            |_args| async {
                Ok::<_, String>(Response {
                    success: false,
                    value: 0,
                })
            },
            None,
        );

        let result = op.call(vec![json!(9)]).await.unwrap();
        assert!(!result.success);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_plain_values_pass_through_uncached() {
        let (cache, _) = cache();
        let op = with_cache(cache.clone(), "count", |_args| async { Ok::<_, String>(7u32) }, None);

        assert_eq!(op.call(vec![]).await.unwrap(), 7);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_ttl_override() {
        let (cache, clock) = cache();
        let op = with_cache(
            cache.clone(),
            "getSettings",
            |_args| async { Ok::<_, String>(json!({"success": true})) },
            Some(Duration::from_millis(100)),
        );

        op.call(vec![]).await.unwrap();
        assert_eq!(cache.stats().entries[0].ttl_ms, 100);

        clock.advance(Duration::from_millis(101));
        assert!(cache.get("getSettings", &[]).is_none());
    }

    #[tokio::test]
    async fn test_mismatched_cached_shape_refetches() {
        let (cache, _) = cache();
        cache.set("getAnswer", &[], json!({"success": true, "other": "shape"}), None);

        let op = with_cache(
            cache.clone(),
            "getAnswer",
            |_args| async {
                Ok::<_, String>(Response {
                    success: true,
                    value: 1,
                })
            },
            None,
        );

        assert_eq!(op.call(vec![]).await.unwrap().value, 1);
        assert_eq!(
            cache.get("getAnswer", &[]),
            Some(json!({"success": true, "value": 1}))
        );
    }
}
