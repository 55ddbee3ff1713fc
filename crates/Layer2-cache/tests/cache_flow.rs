//! End-to-end flows through the cache context
//!
//! `cargo test -p mealdesk-cache --test cache_flow`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mealdesk_cache::{with_cache, CacheContext, CacheEvent};
use mealdesk_foundation::{CacheSettings, InstanceConfig, ManualClock, MemoryStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Meal {
    id: i64,
    name: String,
}

/// Fake backend with a call counter
#[derive(Default)]
struct FakeApi {
    meal_calls: AtomicUsize,
}

impl FakeApi {
    async fn get_meal(&self, args: Vec<Value>) -> Result<ApiResponse<Meal>, String> {
        self.meal_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let id = args
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| "missing id".to_string())?;
        Ok(ApiResponse::ok(Meal {
            id,
            name: format!("meal-{}", id),
        }))
    }

    fn calls(&self) -> usize {
        self.meal_calls.load(Ordering::SeqCst)
    }
}

fn context(clock: &ManualClock) -> CacheContext {
    CacheContext::new(
        CacheSettings::default(),
        Some(Arc::new(MemoryStore::new())),
        Arc::new(clock.clone()),
    )
    .expect("valid settings")
}

#[tokio::test]
async fn test_memoized_fetch_then_invalidate_on_write() {
    let clock = ManualClock::default();
    let ctx = context(&clock);
    let api = Arc::new(FakeApi::default());

    let backend = api.clone();
    let get_meal = with_cache(
        ctx.dynamic_data(),
        "getMealById",
        move |args| {
            let backend = backend.clone();
            async move { backend.get_meal(args).await }
        },
        None,
    );

    let first = get_meal.call(vec![json!(5)]).await.unwrap();
    let second = get_meal.call(vec![json!(5)]).await.unwrap();
    assert_eq!(first.data.as_ref().map(|m| m.id), Some(5));
    assert_eq!(first, second);
    assert_eq!(api.calls(), 1);

    // Editing a meal purges per-id reads
    assert_eq!(ctx.invalidate_event(CacheEvent::MealUpdated), 1);
    get_meal.call(vec![json!(5)]).await.unwrap();
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn test_failed_fetch_propagates_and_is_not_cached() {
    let clock = ManualClock::default();
    let ctx = context(&clock);
    let api = Arc::new(FakeApi::default());

    let backend = api.clone();
    let get_meal = with_cache(
        ctx.dynamic_data(),
        "getMealById",
        move |args| {
            let backend = backend.clone();
            async move { backend.get_meal(args).await }
        },
        None,
    );

    let err = get_meal.call(vec![json!("not-a-number")]).await.unwrap_err();
    assert_eq!(err, "missing id");
    assert!(ctx.dynamic_data().is_empty());

    get_meal.call(vec![json!("not-a-number")]).await.unwrap_err();
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_misses_are_not_coalesced() {
    let clock = ManualClock::default();
    let ctx = context(&clock);
    let api = Arc::new(FakeApi::default());

    let backend = api.clone();
    let get_meal = with_cache(
        ctx.dynamic_data(),
        "getMealById",
        move |args| {
            let backend = backend.clone();
            async move { backend.get_meal(args).await }
        },
        None,
    );

    let (a, b) = futures::join!(get_meal.call(vec![json!(1)]), get_meal.call(vec![json!(1)]));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(api.calls(), 2);
    assert_eq!(ctx.dynamic_data().len(), 1);
}

#[tokio::test]
async fn test_unknown_event_leaves_caches_untouched() {
    let clock = ManualClock::default();
    let ctx = context(&clock);
    ctx.static_data().set("getCategories", &[], json!({"success": true}), None);
    ctx.dynamic_data().set("getAllMeals", &[], json!({"success": true}), None);

    let before: Vec<usize> = ctx.stats().iter().map(|s| s.size).collect();
    assert_eq!(ctx.invalidate_cache("someFutureEvent"), 0);
    let after: Vec<usize> = ctx.stats().iter().map(|s| s.size).collect();
    assert_eq!(before, after);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_purges_on_interval() {
    let clock = ManualClock::default();
    let settings = CacheSettings {
        dynamic_data: InstanceConfig::new(Duration::from_secs(30), 10, false),
        sweep_interval_ms: 60_000,
        ..CacheSettings::default()
    };
    let mut ctx = CacheContext::new(settings, None, Arc::new(clock.clone())).unwrap();
    ctx.dynamic_data().set("getAllMeals", &[], json!([]), None);
    ctx.static_data().set("getCategories", &[], json!([]), None);
    ctx.start_sweeper();

    // Entry expires on the cache clock, sweep fires on the runtime clock
    clock.advance(Duration::from_secs(31));
    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(ctx.dynamic_data().len(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(ctx.dynamic_data().len(), 0);
    assert_eq!(ctx.static_data().len(), 1);

    ctx.shutdown();
    ctx.dynamic_data().set("getAllMeals", &[], json!([]), None);
    clock.advance(Duration::from_secs(31));
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(ctx.dynamic_data().len(), 1);
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let clock = ManualClock::default();
    let store = Arc::new(MemoryStore::new());
    let ctx = CacheContext::new(
        CacheSettings::default(),
        Some(store.clone()),
        Arc::new(clock),
    )
    .unwrap();

    ctx.user_data().set("getProfile", &[json!("u1")], json!({"success": true}), None);
    ctx.static_data().set("getCategories", &[], json!({"success": true}), None);
    assert_eq!(store.len(), 2);

    ctx.clear_all();
    assert!(store.is_empty());
    assert!(ctx.stats().iter().all(|s| s.entries.is_empty()));
}
