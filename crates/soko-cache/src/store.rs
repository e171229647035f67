//! Bounded in-memory cache with TTL and priority-aware eviction.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::key::CacheKey;

/// A single cached entry.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    stored_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Counters exposed for debugging; not correctness-critical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expired: u64,
}

/// Bounded key→value store with per-entry TTL.
///
/// Values are cloned out on `get`; callers share cached collections by
/// storing `Arc`-backed payloads and must treat them as immutable.
///
/// Eviction at capacity removes the oldest entry that is expired or does
/// not fall under a priority prefix. When every entry is both live and
/// priority, the globally oldest entry goes anyway — capacity pressure
/// beats priority.
///
/// All methods take `&self`; mutation is guarded by an internal mutex that
/// is never held across an await point.
pub struct AdvancedCache<V> {
    inner: Mutex<Inner<V>>,
    max_size: usize,
    default_ttl: Duration,
    priority_prefixes: Vec<String>,
}

struct Inner<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    counters: Counters,
}

impl<V: Clone> AdvancedCache<V> {
    /// Create a cache with the given capacity and default TTL.
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                counters: Counters::default(),
            }),
            max_size,
            default_ttl,
            priority_prefixes: Vec::new(),
        }
    }

    /// Mark key prefixes whose entries should survive eviction while live.
    pub fn with_priority_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Store a value under `key`, expiring after `ttl` (or the default).
    pub fn set(&self, key: CacheKey, data: V, ttl: Option<Duration>) {
        self.insert_at(key, data, ttl, Instant::now());
    }

    /// Look up `key`, dropping the entry if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.lookup_at(key, Instant::now())
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        CacheStats {
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            evictions: inner.counters.evictions,
            expired: inner.counters.expired,
            entries: inner.entries.len(),
        }
    }

    fn is_priority(&self, key: &CacheKey) -> bool {
        self.priority_prefixes.iter().any(|p| key.has_prefix(p))
    }

    fn insert_at(&self, key: CacheKey, data: V, ttl: Option<Duration>, now: Instant) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        let inner = &mut *guard;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            if let Some(victim) = self.pick_victim(&inner.entries, now) {
                debug!(key = %victim, "cache evicting entry at capacity");
                inner.entries.remove(&victim);
                inner.counters.evictions += 1;
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: now,
                expires_at: now + ttl,
            },
        );
    }

    fn lookup_at(&self, key: &CacheKey, now: Instant) -> Option<V> {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        let inner = &mut *guard;

        if let Some(entry) = inner.entries.get(key) {
            if entry.is_expired(now) {
                inner.entries.remove(key);
                inner.counters.expired += 1;
                inner.counters.misses += 1;
                debug!(key = %key, "cache entry expired");
                return None;
            }
            let data = entry.data.clone();
            inner.counters.hits += 1;
            return Some(data);
        }

        inner.counters.misses += 1;
        None
    }

    /// Oldest expired-or-non-priority entry; falls back to the globally
    /// oldest when everything is live and priority.
    fn pick_victim(
        &self,
        entries: &HashMap<CacheKey, CacheEntry<V>>,
        now: Instant,
    ) -> Option<CacheKey> {
        let candidate = entries
            .iter()
            .filter(|(key, entry)| entry.is_expired(now) || !self.is_priority(key))
            .min_by_key(|(_, entry)| entry.stored_at)
            .map(|(key, _)| key.clone());

        candidate.or_else(|| {
            entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone())
        })
    }
}
