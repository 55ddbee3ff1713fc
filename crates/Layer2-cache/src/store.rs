//! In-memory entry store
//!
//! Keyed map of [`CacheEntry`] bounded by entry count. Eviction is strict LRU:
//! every read and write bumps an access counter and the entry with the oldest
//! access goes first. Expired entries are purged before any live entry is
//! evicted.

use std::collections::HashMap;

use crate::entry::CacheEntry;

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    last_access: u64,
}

/// Bounded key → entry map with LRU eviction
#[derive(Debug)]
pub struct EntryStore {
    slots: HashMap<String, Slot>,
    max_entries: usize,
    access_counter: u64,
}

impl EntryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(max_entries.min(1024)),
            max_entries: max_entries.max(1),
            access_counter: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    /// Look up an entry, bumping its recency
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        let tick = self.tick();
        self.slots.get_mut(key).map(|slot| {
            slot.last_access = tick;
            &slot.entry
        })
    }

    /// Look up without touching recency
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        self.slots.get(key).map(|slot| &slot.entry)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Insert or overwrite an entry
    ///
    /// Returns the keys removed to make room (expired first, then LRU).
    pub fn insert(&mut self, key: String, entry: CacheEntry, now_ms: i64) -> Vec<String> {
        let tick = self.tick();

        if let Some(slot) = self.slots.get_mut(&key) {
            slot.entry = entry;
            slot.last_access = tick;
            return Vec::new();
        }

        let mut removed = Vec::new();
        if self.slots.len() >= self.max_entries {
            removed = self.remove_expired(now_ms);
        }
        while self.slots.len() >= self.max_entries {
            match self.evict_lru() {
                Some(evicted) => removed.push(evicted),
                None => break,
            }
        }

        self.slots.insert(
            key,
            Slot {
                entry,
                last_access: tick,
            },
        );
        removed
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.slots.remove(key).map(|slot| slot.entry)
    }

    /// Remove every key containing any of `patterns`
    pub fn remove_matching(&mut self, patterns: &[&str]) -> Vec<String> {
        self.remove_where(|key, _| patterns.iter().any(|p| key.contains(p)))
    }

    /// Remove every entry whose live window has passed
    pub fn remove_expired(&mut self, now_ms: i64) -> Vec<String> {
        self.remove_where(|_, entry| entry.is_expired(now_ms))
    }

    fn remove_where<F>(&mut self, mut f: F) -> Vec<String>
    where
        F: FnMut(&str, &CacheEntry) -> bool,
    {
        let doomed: Vec<String> = self
            .slots
            .iter()
            .filter(|(k, slot)| f(k.as_str(), &slot.entry))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.slots.remove(key);
        }
        doomed
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.slots.iter().map(|(k, slot)| (k, &slot.entry))
    }

    fn evict_lru(&mut self) -> Option<String> {
        let lru_key = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_access)
            .map(|(k, _)| k.clone())?;
        self.slots.remove(&lru_key);
        Some(lru_key)
    }
}
