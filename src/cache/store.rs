//! Cache Store Module
//!
//! Keyed TTL store contract plus the in-memory implementation backing it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheStats};
use crate::error::StoreError;

/// Result of a value store operation.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Value Store ==
/// Keyed get/set/expire contract with per-entry TTL.
///
/// `get` returns `Ok(None)` for absent and expired keys alike; `Err` is
/// reserved for the backing storage itself failing.
#[async_trait]
pub trait ValueStore<V>: Send + Sync {
    /// Returns the value under `key` if present and not expired.
    async fn get(&self, key: &str) -> StoreResult<Option<V>>;

    /// Stores `value` under `key` for `ttl`, replacing any prior entry.
    async fn set(&self, key: &str, value: V, ttl: Duration) -> StoreResult<()>;

    /// Drops the entry under `key`. Returns whether a valid entry was removed.
    async fn expire(&self, key: &str) -> StoreResult<bool>;
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
}

// == Memory Store ==
/// In-process TTL store guarded by a single lock.
///
/// Every read and write takes the lock, so a concurrent `set`/`get` pair
/// never observes a half-written entry.
#[derive(Debug)]
pub struct MemoryStore<V> {
    inner: RwLock<Inner<V>>,
}

impl<V> MemoryStore<V> {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::new(),
            }),
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let now = Instant::now();

        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - inner.entries.len();

        let remaining = inner.entries.len();
        inner.stats.record_expirations(removed);
        inner.stats.set_total_entries(remaining);
        removed
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> ValueStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> StoreResult<Option<V>> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let expired = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                inner.stats.record_hit();
                return Ok(Some(value));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.record_expirations(1);
            let remaining = inner.entries.len();
            inner.stats.set_total_entries(remaining);
        }
        inner.stats.record_miss();
        Ok(None)
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        inner.stats.record_write();
        let count = inner.entries.len();
        inner.stats.set_total_entries(count);
        Ok(())
    }

    async fn expire(&self, key: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .entries
            .remove(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false);
        let count = inner.entries.len();
        inner.stats.set_total_entries(count);
        Ok(removed)
    }
}
