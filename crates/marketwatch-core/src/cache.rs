//! Bounded per-entity-type response cache.
//!
//! Keys are request signatures (`users/5/alerts`, `users/5/alerts/9`,
//! or a full list URL including its query string). A key holds either a
//! single entity or an ordered list; the variant is part of the entry,
//! so a lookup expecting one shape that finds the other treats the entry
//! as stale and evicts it instead of returning a mismatched value.
//!
//! Reads and writes always clone, so callers can never mutate the cached
//! copy in place.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

/// Cached value shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue<T> {
    Single(T),
    List(Vec<T>),
}

/// Capacity and expiry policy for one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityCacheConfig {
    /// Maximum number of entries before least-recently-used eviction.
    pub capacity: usize,
    /// Entries older than this are treated as absent on lookup.
    pub max_age: Option<Duration>,
}

impl Default for EntityCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            max_age: None,
        }
    }
}

impl EntityCacheConfig {
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            max_age: None,
        }
    }

    pub const fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: CachedValue<T>,
    inserted_at: Instant,
    last_accessed: u64,
}

#[derive(Debug)]
struct CacheInner<T> {
    map: HashMap<String, Entry<T>>,
    config: EntityCacheConfig,
    /// Logical clock; bumped on every touch so recency is total-ordered.
    tick: u64,
}

impl<T: Clone> CacheInner<T> {
    fn new(config: EntityCacheConfig) -> Self {
        Self {
            map: HashMap::new(),
            config,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn is_expired(&self, entry: &Entry<T>) -> bool {
        self.config
            .max_age
            .map(|max_age| entry.inserted_at.elapsed() > max_age)
            .unwrap_or(false)
    }

    /// Live entry for `key`, dropping it first when expired.
    fn live_entry(&mut self, key: &str) -> Option<&mut Entry<T>> {
        if self.map.get(key).map(|e| self.is_expired(e)).unwrap_or(false) {
            self.map.remove(key);
            return None;
        }

        self.map.get_mut(key)
    }

    fn insert(&mut self, key: String, value: CachedValue<T>) {
        let tick = self.next_tick();
        self.map.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                last_accessed: tick,
            },
        );

        while self.map.len() > self.config.capacity {
            let Some(lru_key) = self
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone())
            else {
                break;
            };

            debug!(key = %lru_key, "evicting least-recently-used cache entry");
            self.map.remove(&lru_key);
        }
    }
}

/// Thread-safe LRU cache for one entity type.
#[derive(Debug, Clone)]
pub struct EntityCache<T> {
    inner: Arc<tokio::sync::RwLock<CacheInner<T>>>,
}

impl<T: Clone> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new(EntityCacheConfig::default())
    }
}

impl<T: Clone> EntityCache<T> {
    pub fn new(config: EntityCacheConfig) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(config))),
        }
    }

    /// Single-entity lookup. A cached list under this key is a stale
    /// collision and is evicted.
    pub async fn get_single(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.write().await;
        let tick = inner.next_tick();

        match inner.live_entry(key) {
            Some(entry) => match &entry.value {
                CachedValue::Single(value) => {
                    entry.last_accessed = tick;
                    Some(value.clone())
                }
                CachedValue::List(_) => {
                    inner.map.remove(key);
                    None
                }
            },
            None => None,
        }
    }

    /// List lookup. A cached single entity under this key is evicted.
    pub async fn get_list(&self, key: &str) -> Option<Vec<T>> {
        let mut inner = self.inner.write().await;
        let tick = inner.next_tick();

        match inner.live_entry(key) {
            Some(entry) => match &entry.value {
                CachedValue::List(values) => {
                    entry.last_accessed = tick;
                    Some(values.clone())
                }
                CachedValue::Single(_) => {
                    inner.map.remove(key);
                    None
                }
            },
            None => None,
        }
    }

    pub async fn insert_single(&self, key: impl Into<String>, value: T) {
        let mut inner = self.inner.write().await;
        inner.insert(key.into(), CachedValue::Single(value));
    }

    pub async fn insert_list(&self, key: impl Into<String>, values: Vec<T>) {
        let mut inner = self.inner.write().await;
        inner.insert(key.into(), CachedValue::List(values));
    }

    pub async fn remove(&self, key: &str) {
        let mut inner = self.inner.write().await;
        inner.map.remove(key);
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.map.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replace the matching element of a cached list in place, or append
    /// when absent. Untouched when no list is cached under `key`; a
    /// non-list entry is evicted as stale.
    pub async fn upsert_in_list<F>(&self, key: &str, item: T, is_same: F)
    where
        F: Fn(&T) -> bool,
    {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.live_entry(key) else {
            return;
        };

        match &mut entry.value {
            CachedValue::List(values) => {
                if let Some(existing) = values.iter_mut().find(|candidate| is_same(candidate)) {
                    *existing = item;
                } else {
                    values.push(item);
                }
            }
            CachedValue::Single(_) => {
                inner.map.remove(key);
            }
        }
    }

    /// Drop matching elements from a cached list. A non-list entry under
    /// `key` is evicted as stale.
    pub async fn remove_from_list<F>(&self, key: &str, is_match: F)
    where
        F: Fn(&T) -> bool,
    {
        let mut inner = self.inner.write().await;

        let Some(entry) = inner.live_entry(key) else {
            return;
        };

        match &mut entry.value {
            CachedValue::List(values) => {
                values.retain(|candidate| !is_match(candidate));
            }
            CachedValue::Single(_) => {
                inner.map.remove(key);
            }
        }
    }
}
