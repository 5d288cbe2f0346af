//! Response caching with TTL expiry and LRU eviction.
//!
//! Successful fetches are cached under a deterministic key derived from the
//! full request identity, so an identical request within the TTL is served
//! without touching the network or the rate limiter. The cache is bounded:
//! when full, the least-recently-used entry makes room for the new one.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::types::DatasetResponse;

struct CacheEntry {
    value: DatasetResponse,
    expires_at: Instant,
}

struct CacheState {
    entries: LruCache<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Bounded in-memory cache for parsed dataset responses.
///
/// Entries expire `ttl` after insertion and are purged lazily, on the next
/// lookup that touches them. Hit and miss counters are lifetime totals;
/// [`clear`](ResponseCache::clear) empties the map but leaves them intact
/// so statistics keep describing the whole process run.
///
/// One mutex guards the map and both counters. It is held only for the map
/// operation itself, never across I/O, so lookups stay cheap even while
/// fetches are in flight.
pub struct ResponseCache {
    inner: Mutex<CacheState>,
    max_size: usize,
}

impl ResponseCache {
    /// Creates a cache holding at most `max_size` responses.
    ///
    /// `Config::validate` rejects a zero capacity; the clamp here keeps a
    /// direct constructor usable without panicking inside `lru`.
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        ResponseCache {
            inner: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
            max_size: capacity.get(),
        }
    }

    /// Returns the cached response for `key` if present and unexpired.
    ///
    /// A live hit bumps the entry to most-recently-used and increments the
    /// hit counter. An expired entry is removed and counted as a miss, the
    /// same as an absent key.
    pub fn get(&self, key: &str) -> Option<DatasetResponse> {
        let now = Instant::now();
        let mut state = self.inner.lock();

        let expired = matches!(state.entries.peek(key), Some(entry) if entry.expires_at <= now);
        if expired {
            state.entries.pop(key);
        }
        // `get` rather than `peek`: a hit refreshes recency.
        if let Some(entry) = state.entries.get(key) {
            let value = entry.value.clone();
            state.hits += 1;
            return Some(value);
        }
        state.misses += 1;
        None
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// Replaces any existing entry for the key. At capacity, the
    /// least-recently-used entry is evicted to make room.
    pub fn insert(&self, key: String, value: DatasetResponse, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.inner.lock().entries.put(key, entry);
    }

    /// Removes every entry. Lifetime hit/miss counters are preserved.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        let total = state.hits + state.misses;
        let hit_rate = if total == 0 {
            "0.00%".to_string()
        } else {
            format!("{:.2}%", state.hits as f64 / total as f64 * 100.0)
        };
        CacheStats {
            size: state.entries.len(),
            max_size: self.max_size,
            hits: state.hits,
            misses: state.misses,
            hit_rate,
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries currently held (live and not-yet-purged expired ones).
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// Lifetime lookups served from cache.
    pub hits: u64,
    /// Lifetime lookups that fell through to the network path.
    pub misses: u64,
    /// `hits / (hits + misses)` as a percentage string, `"0.00%"` before
    /// any lookup.
    pub hit_rate: String,
}

/// Cache statistics envelope, covering the cache-disabled case.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatistics {
    pub cache_enabled: bool,
    #[serde(flatten)]
    pub stats: Option<CacheStats>,
}

/// Derives the cache key identifying one logical request.
///
/// The encoding is canonical: filters are consumed in `BTreeMap` order and
/// an empty filter map hashes identically to no filters, so equivalent
/// requests always collide onto one entry. The API key is deliberately not
/// part of the identity.
pub fn response_key(
    resource_id: &str,
    offset: u64,
    limit: u64,
    filters: Option<&BTreeMap<String, String>>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(resource_id.as_bytes());
    hasher.update(b"|");
    hasher.update(offset.to_le_bytes());
    hasher.update(b"|");
    hasher.update(limit.to_le_bytes());
    if let Some(filters) = filters {
        for (field, value) in filters {
            hasher.update(b"|");
            hasher.update(field.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}
