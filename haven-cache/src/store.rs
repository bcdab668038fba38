//! Bounded key/value store with per-entry priority, TTL, and access statistics.
//!
//! Expiry is applied lazily on every read and eagerly by
//! [`CacheStore::sweep_expired`], which the background sweeper calls on an
//! interval. When the store is full, inserting a new key evicts exactly one
//! entry: the lowest priority tier first, then the fewest accesses, then the
//! least recently accessed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use haven_core::{elapsed_between, CacheConfig, Clock, Priority, Timestamp};
use serde::{Deserialize, Serialize};

// ============================================================================
// OPTIONS
// ============================================================================

/// Per-insertion options for [`CacheStore::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetOptions {
    /// Priority tier. Defaults to nice-to-have.
    pub priority: Option<Priority>,
    /// Explicit TTL. Defaults to the configured TTL for the priority.
    pub ttl: Option<Duration>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a critical entry with the configured critical TTL.
    pub fn critical() -> Self {
        Self::new().with_priority(Priority::Critical)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

// ============================================================================
// ENTRIES
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    created_at: Timestamp,
    priority: Priority,
    ttl: Duration,
    access_count: u64,
    last_accessed_at: Timestamp,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Timestamp) -> bool {
        elapsed_between(self.created_at, now) > self.ttl
    }

    fn eviction_rank(&self) -> (u8, u64, Timestamp) {
        (self.priority.rank(), self.access_count, self.last_accessed_at)
    }
}

/// Read-only view of an entry's bookkeeping, without its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub key: String,
    pub priority: Priority,
    pub ttl: Duration,
    pub created_at: Timestamp,
    pub access_count: u64,
    pub last_accessed_at: Timestamp,
}

impl EntryMetadata {
    fn from_entry<T>(key: &str, entry: &CacheEntry<T>) -> Self {
        Self {
            key: key.to_string(),
            priority: entry.priority,
            ttl: entry.ttl,
            created_at: entry.created_at,
            access_count: entry.access_count,
            last_accessed_at: entry.last_accessed_at,
        }
    }

    /// Instant after which the entry is considered expired.
    pub fn expires_at(&self) -> Timestamp {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        self.created_at
            .checked_add_signed(ttl)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Derived snapshot of the store. Never a source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries currently held (including expired entries not yet swept).
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    pub critical_entries: usize,
    pub important_entries: usize,
    pub nice_to_have_entries: usize,
    /// Mean access count across held entries.
    pub average_access_count: f64,
    /// Age of the oldest entry.
    pub oldest_entry_age: Option<Duration>,
    /// Age of the newest entry.
    pub newest_entry_age: Option<Duration>,
    /// Reads that returned data.
    pub hits: u64,
    /// Reads that found nothing or an expired entry.
    pub misses: u64,
    /// Entries removed to make room.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Count of entries at the given tier.
    pub fn entries_at(&self, priority: Priority) -> usize {
        match priority {
            Priority::Critical => self.critical_entries,
            Priority::Important => self.important_entries,
            Priority::NiceToHave => self.nice_to_have_entries,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

#[derive(Debug)]
struct StoreState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    counters: Counters,
}

// ============================================================================
// STORE
// ============================================================================

/// Bounded, priority-and-TTL-aware key/value store.
///
/// All state sits behind a single mutex; no operation awaits while holding
/// it, so the store is safe to share between async tasks and the background
/// sweeper through an `Arc`.
#[derive(Debug)]
pub struct CacheStore<T> {
    state: Mutex<StoreState<T>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<T> CacheStore<T> {
    /// Create a new store. `config.max_size` is clamped to at least one entry.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let config = CacheConfig {
            max_size: config.max_size.max(1),
            ..config
        };
        Self {
            state: Mutex::new(StoreState {
                entries: HashMap::with_capacity(config.max_size),
                counters: Counters::default(),
            }),
            config,
            clock,
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the clock the store measures expiry with.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<T>> {
        // Every mutation leaves the map consistent, so a panic elsewhere
        // cannot leave it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite an entry.
    ///
    /// Inserting a new key into a full store evicts exactly one entry first.
    /// Overwriting resets `created_at`, TTL, and access statistics.
    pub fn set(&self, key: impl Into<String>, data: T, options: SetOptions) {
        let key = key.into();
        let now = self.clock.now();
        let priority = options.priority.unwrap_or_default();
        let ttl = options.ttl.unwrap_or_else(|| self.config.ttl_for(priority));

        let mut state = self.lock();
        if !state.entries.contains_key(&key) && state.entries.len() >= self.config.max_size {
            Self::evict_one(&mut state);
        }
        state.entries.insert(
            key,
            CacheEntry {
                data,
                created_at: now,
                priority,
                ttl,
                access_count: 0,
                last_accessed_at: now,
            },
        );
    }

    fn evict_one(state: &mut StoreState<T>) {
        let victim = state
            .entries
            .iter()
            .min_by(|(ka, a), (kb, b)| {
                a.eviction_rank()
                    .cmp(&b.eviction_rank())
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            if let Some(entry) = state.entries.remove(&key) {
                state.counters.evictions += 1;
                tracing::debug!(
                    key = %key,
                    priority = %entry.priority,
                    access_count = entry.access_count,
                    "Evicted cache entry"
                );
            }
        }
    }

    /// Check whether a non-expired entry exists, without counting an access.
    ///
    /// An expired entry is removed, exactly as a read would.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };
        if expired {
            state.entries.remove(key);
            state.counters.expirations += 1;
        }
        !expired
    }

    /// Remove an entry. Returns whether one was present.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Remove every entry. Returns the number removed.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let removed = state.entries.len();
        state.entries.clear();
        removed
    }

    /// Number of held entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently held, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Bookkeeping for an entry, without touching its access statistics.
    pub fn entry_metadata(&self, key: &str) -> Option<EntryMetadata> {
        self.lock()
            .entries
            .get(key)
            .map(|entry| EntryMetadata::from_entry(key, entry))
    }

    /// Remove every entry whose TTL has elapsed. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.entries.len();
        state.counters.expirations += removed as u64;
        removed
    }

    /// Derived snapshot of size, tiers, access patterns, and lifetime counters.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let state = self.lock();

        let mut stats = CacheStats {
            size: state.entries.len(),
            max_size: self.config.max_size,
            hits: state.counters.hits,
            misses: state.counters.misses,
            evictions: state.counters.evictions,
            expirations: state.counters.expirations,
            ..CacheStats::default()
        };

        let mut total_accesses: u64 = 0;
        let mut oldest: Option<Timestamp> = None;
        let mut newest: Option<Timestamp> = None;
        for entry in state.entries.values() {
            match entry.priority {
                Priority::Critical => stats.critical_entries += 1,
                Priority::Important => stats.important_entries += 1,
                Priority::NiceToHave => stats.nice_to_have_entries += 1,
            }
            total_accesses += entry.access_count;
            oldest = Some(oldest.map_or(entry.created_at, |o| o.min(entry.created_at)));
            newest = Some(newest.map_or(entry.created_at, |n| n.max(entry.created_at)));
        }

        if stats.size > 0 {
            stats.average_access_count = total_accesses as f64 / stats.size as f64;
        }
        stats.oldest_entry_age = oldest.map(|t| elapsed_between(t, now));
        stats.newest_entry_age = newest.map(|t| elapsed_between(t, now));
        stats
    }
}

impl<T: Clone> CacheStore<T> {
    /// Read an entry, applying lazy expiry and recording the access.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut guard = self.lock();
        let state = &mut *guard;

        match state.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.access_count += 1;
                entry.last_accessed_at = now;
                state.counters.hits += 1;
                Some(entry.data.clone())
            }
            Some(_) => {
                state.entries.remove(key);
                state.counters.expirations += 1;
                state.counters.misses += 1;
                tracing::trace!(key = %key, "Expired cache entry on read");
                None
            }
            None => {
                state.counters.misses += 1;
                None
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
