//! Resolution cache.
//!
//! Remembers which controller served a resource name so that later requests
//! for the same name skip candidate search. Entries are keyed by the
//! effective resource name and remember the schema they were resolved for;
//! a lookup under a different schema evicts the entry instead of reusing it.
//!
//! Capacity eviction is oldest-first. Insertion order is kept in a queue of
//! `(name, generation)` stamps next to the map; a stamp whose entry has since
//! been replaced or removed is skipped when popped, and the queue is
//! compacted once it holds twice the capacity.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use synergy_core::{Schema, SharedController};
use synergy_telemetry::metrics::{record_cache, CacheOutcome};

/// Configuration for the resolution cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries. `0` disables the cache.
    pub max_entries: usize,
    /// Optional lifetime of an entry. `None` keeps entries until evicted.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: None,
        }
    }
}

impl CacheConfig {
    /// A configuration that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_entries: 0,
            ttl: None,
        }
    }

    /// Sets the entry lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[derive(Clone)]
struct CacheEntry {
    controller: SharedController,
    schema: Schema,
    created_at: Instant,
    generation: u64,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.created_at.elapsed() > ttl)
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups that returned a controller.
    pub hits: u64,
    /// Number of lookups that returned nothing.
    pub misses: u64,
    /// Number of entries currently cached.
    pub size: usize,
    /// Number of entries dropped for capacity, expiry or schema change.
    pub evictions: u64,
}

/// Concurrent name → controller memo owned by one dispatcher.
///
/// Concurrent lookups and inserts never corrupt the map; two requests racing
/// to resolve the same name may both search, and the later insert wins.
pub struct ResolutionCache {
    config: CacheConfig,
    entries: DashMap<String, CacheEntry>,
    order: Mutex<VecDeque<(String, u64)>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResolutionCache {
    /// Creates a cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns true if the cache can store entries.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.max_entries > 0
    }

    /// Looks up the controller cached for `name`.
    ///
    /// An entry resolved under a different schema, or past its lifetime, is
    /// evicted and reported as a miss.
    pub fn get(&self, name: &str, schema: &Schema) -> Option<SharedController> {
        if !self.is_enabled() {
            self.miss();
            return None;
        }

        let ttl = self.config.ttl;
        let lookup = self.entries.get(name).map(|entry| {
            if entry.schema == *schema && !entry.is_expired(ttl) {
                Some(Arc::clone(&entry.controller))
            } else {
                None
            }
        });

        match lookup {
            Some(Some(controller)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                record_cache(CacheOutcome::Hit);
                Some(controller)
            }
            Some(None) => {
                let removed = self
                    .entries
                    .remove_if(name, |_, entry| entry.schema != *schema || entry.is_expired(ttl));
                if removed.is_some() {
                    tracing::debug!(resource = name, schema = %schema, "Stale resolution evicted");
                    self.evicted(1);
                }
                self.miss();
                None
            }
            None => {
                self.miss();
                None
            }
        }
    }

    /// Caches `controller` for `name`, replacing any existing entry.
    ///
    /// Inserts are serialized by the order queue lock; lookups are not.
    pub fn insert(&self, name: &str, schema: &Schema, controller: SharedController) {
        if !self.is_enabled() {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut order = self.order.lock();

        if !self.entries.contains_key(name) {
            while self.entries.len() >= self.config.max_entries {
                let Some((oldest, stamp)) = order.pop_front() else {
                    break;
                };
                let removed = self
                    .entries
                    .remove_if(&oldest, |_, entry| entry.generation == stamp);
                if removed.is_some() {
                    self.evicted(1);
                }
            }
        }

        self.entries.insert(
            name.to_string(),
            CacheEntry {
                controller,
                schema: schema.clone(),
                created_at: Instant::now(),
                generation,
            },
        );
        order.push_back((name.to_string(), generation));

        if order.len() > self.config.max_entries.saturating_mul(2) {
            order.retain(|(key, stamp)| {
                self.entries
                    .get(key)
                    .is_some_and(|entry| entry.generation == *stamp)
            });
        }
    }

    /// Removes the entry for `name`, returning true if one existed.
    pub fn remove(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Returns the name of the controller cached for `name`, without
    /// touching the hit/miss counters.
    #[must_use]
    pub fn peek(&self, name: &str) -> Option<String> {
        self.entries
            .get(name)
            .map(|entry| entry.controller.name().to_string())
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut order = self.order.lock();
        self.entries.clear();
        order.clear();
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        record_cache(CacheOutcome::Miss);
    }

    fn evicted(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
        for _ in 0..count {
            record_cache(CacheOutcome::Evict);
        }
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
