//! # mealdesk-cache
//!
//! Client-side API response cache for the Mealdesk admin console.
//!
//! ## Architecture
//!
//! ```text
//! caller ──▶ CachedOperation::call(args)
//!               │ make_key(name, args)
//!               ▼
//!           QueryCache::get ──hit──▶ cached result
//!               │ miss
//!               ▼
//!           underlying async fn ──▶ {"success": true, ..} ──▶ QueryCache::set
//!                                                              │
//!                                                              ▼
//!                                                        DurableShadow
//!
//! domain write ──▶ InvalidationRouter::invalidate_cache(event)
//!                     └──▶ QueryCache::invalidate(patterns) on every instance
//!
//! Sweeper (tokio interval) ──▶ QueryCache::sweep_expired on every instance
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mealdesk_cache::{with_cache, CacheContext, CacheEvent};
//! use mealdesk_foundation::{CacheSettings, SqliteStore, SystemClock};
//!
//! let store = Arc::new(SqliteStore::open(&data_dir)?);
//! let mut ctx = CacheContext::new(CacheSettings::load()?, Some(store), Arc::new(SystemClock))?;
//! ctx.start_sweeper();
//!
//! let get_meals = with_cache(ctx.dynamic_data(), "getAllMeals", |_| api.get_all_meals(), None);
//! let meals = get_meals.call(vec![]).await?;
//!
//! api.create_meal(&meal).await?;
//! ctx.invalidate_event(CacheEvent::MealCreated);
//! ```

pub mod context;
pub mod entry;
pub mod invalidation;
pub mod key;
pub mod query_cache;
pub mod shadow;
pub mod store;
pub mod sweeper;
pub mod wrap;

pub use context::{CacheContext, DYNAMIC_CACHE, STATIC_CACHE, USER_CACHE};
pub use entry::CacheEntry;
pub use invalidation::{CacheEvent, InvalidationRouter, InvalidationTable};
pub use key::{canonical_json, make_key};
pub use query_cache::{CacheStats, EntryStats, QueryCache};
pub use shadow::DurableShadow;
pub use store::EntryStore;
pub use sweeper::Sweeper;
pub use wrap::{is_success, with_cache, CachedOperation};
