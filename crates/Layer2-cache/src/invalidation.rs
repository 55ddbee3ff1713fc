//! Event-driven cache invalidation
//!
//! Domain write operations report a named event (e.g. `mealCreated`). The
//! router looks up the operation-name patterns for that event and purges
//! matching keys from every registered cache. Operation names are globally
//! unique, so broadcasting to all instances is safe.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::query_cache::QueryCache;

/// Domain events of the admin console that affect cached reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    // Meals
    MealCreated,
    MealUpdated,
    MealDeleted,
    // Ingredients
    IngredientCreated,
    IngredientUpdated,
    IngredientDeleted,
    // Categories
    CategoryChanged,
    // Users & roles
    UserCreated,
    UserUpdated,
    UserDeleted,
    UserRoleChanged,
    // Cook verification
    CookApplicationSubmitted,
    CookVerified,
    CookRejected,
    // Settings
    SettingsUpdated,
}

impl CacheEvent {
    pub const ALL: [CacheEvent; 15] = [
        CacheEvent::MealCreated,
        CacheEvent::MealUpdated,
        CacheEvent::MealDeleted,
        CacheEvent::IngredientCreated,
        CacheEvent::IngredientUpdated,
        CacheEvent::IngredientDeleted,
        CacheEvent::CategoryChanged,
        CacheEvent::UserCreated,
        CacheEvent::UserUpdated,
        CacheEvent::UserDeleted,
        CacheEvent::UserRoleChanged,
        CacheEvent::CookApplicationSubmitted,
        CacheEvent::CookVerified,
        CacheEvent::CookRejected,
        CacheEvent::SettingsUpdated,
    ];

    /// Event name as used in the pattern table
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEvent::MealCreated => "mealCreated",
            CacheEvent::MealUpdated => "mealUpdated",
            CacheEvent::MealDeleted => "mealDeleted",
            CacheEvent::IngredientCreated => "ingredientCreated",
            CacheEvent::IngredientUpdated => "ingredientUpdated",
            CacheEvent::IngredientDeleted => "ingredientDeleted",
            CacheEvent::CategoryChanged => "categoryChanged",
            CacheEvent::UserCreated => "userCreated",
            CacheEvent::UserUpdated => "userUpdated",
            CacheEvent::UserDeleted => "userDeleted",
            CacheEvent::UserRoleChanged => "userRoleChanged",
            CacheEvent::CookApplicationSubmitted => "cookApplicationSubmitted",
            CacheEvent::CookVerified => "cookVerified",
            CacheEvent::CookRejected => "cookRejected",
            CacheEvent::SettingsUpdated => "settingsUpdated",
        }
    }

    /// Operation-name substrings purged by this event
    fn patterns(&self) -> &'static [&'static str] {
        match self {
            CacheEvent::MealCreated | CacheEvent::MealDeleted => {
                &["getAllMeals", "getMealsBy", "getMealStats", "getDashboardStats"]
            }
            CacheEvent::MealUpdated => &["getAllMeals", "getMealsBy", "getMealById", "getMealStats"],
            CacheEvent::IngredientCreated | CacheEvent::IngredientDeleted => {
                &["getAllIngredients", "getIngredientsBy", "getDashboardStats"]
            }
            CacheEvent::IngredientUpdated => &[
                "getAllIngredients",
                "getIngredientsBy",
                "getIngredientById",
                "getMealById",
            ],
            CacheEvent::CategoryChanged => &["getCategories", "getAllMeals", "getMealsBy"],
            CacheEvent::UserCreated | CacheEvent::UserDeleted => {
                &["getAllUsers", "getUsersBy", "getUserStats", "getDashboardStats"]
            }
            CacheEvent::UserUpdated => &["getAllUsers", "getUsersBy", "getUserById", "getProfile"],
            CacheEvent::UserRoleChanged => &[
                "getAllUsers",
                "getUsersBy",
                "getUserById",
                "getUserRoles",
                "getUserStats",
                "getProfile",
            ],
            CacheEvent::CookApplicationSubmitted => &["getCookApplications", "getPendingCooks"],
            CacheEvent::CookVerified | CacheEvent::CookRejected => &[
                "getCookApplications",
                "getPendingCooks",
                "getVerifiedCooks",
                "getAllUsers",
                "getUserById",
                "getDashboardStats",
            ],
            CacheEvent::SettingsUpdated => &["getSettings", "getAppConfig"],
        }
    }
}

impl std::fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static event name → operation patterns mapping
#[derive(Debug, Clone, Default)]
pub struct InvalidationTable {
    patterns: HashMap<String, Vec<String>>,
}

impl InvalidationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table covering every [`CacheEvent`]
    pub fn standard() -> Self {
        CacheEvent::ALL
            .iter()
            .fold(Self::new(), |table, event| table.with(event.as_str(), event.patterns()))
    }

    /// Builder: add an event with its patterns
    pub fn with(mut self, event: impl Into<String>, patterns: &[&str]) -> Self {
        self.patterns.insert(
            event.into(),
            patterns.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn patterns(&self, event: &str) -> Option<&[String]> {
        self.patterns.get(event).map(Vec::as_slice)
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Broadcasts invalidation events to every cache instance
#[derive(Debug, Clone)]
pub struct InvalidationRouter {
    table: InvalidationTable,
    caches: Vec<Arc<QueryCache>>,
}

impl InvalidationRouter {
    pub fn new(table: InvalidationTable, caches: Vec<Arc<QueryCache>>) -> Self {
        Self { table, caches }
    }

    pub fn table(&self) -> &InvalidationTable {
        &self.table
    }

    /// Purge entries affected by `event`
    ///
    /// Unknown events are ignored. Returns the number of in-memory entries
    /// removed across all caches.
    pub fn invalidate_cache(&self, event: &str) -> usize {
        let Some(patterns) = self.table.patterns(event) else {
            debug!(event, "No invalidation patterns for event");
            return 0;
        };

        let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
        let removed: usize = self
            .caches
            .iter()
            .map(|cache| cache.invalidate(&patterns))
            .sum();

        debug!(event, removed, "Cache invalidation");
        removed
    }

    /// Typed variant of [`invalidate_cache`](Self::invalidate_cache)
    pub fn invalidate_event(&self, event: CacheEvent) -> usize {
        self.invalidate_cache(event.as_str())
    }
}
