//! In-memory TTL cache backed by [`DashMap`].
//!
//! Concurrent `get`/`set` without external locking. Expiry is lazy: an
//! expired entry is dropped by the read that finds it. [`TtlCache::purge_expired`]
//! lets a background sweeper reclaim entries nobody reads again.

use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// A cached value plus its lifetime bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached value. Replaced wholesale, never mutated in place.
    pub value: V,
    /// The entry is live while `now <= expires_at`.
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    #[must_use]
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: now + ttl,
        }
    }

    /// Whether the entry has outlived its TTL at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Generic key-value cache with per-entry TTL.
///
/// Typed over both key and value so a lookup can never return a value of
/// the wrong kind.
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns a clone of the live value at `key`, dropping it if expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        // Re-check under the write lock: a concurrent `set` may have
        // refreshed the entry since the read guard was released.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Stores `value` at `key` for `ttl`, overwriting any previous entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        self.entries
            .insert(key, CacheEntry::new(value, Instant::now(), ttl));
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
