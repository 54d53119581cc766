//! Cache provider trait backing the session store, and an in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::clock::{Clock, SystemClock};
use crate::error::{store_error, Error, StoreErrorKind};

/// Trait for the byte cache session records are persisted in.
///
/// Implementations are shared process-wide and should:
/// - Expire entries once their TTL elapses; an entry is still live at its expiry instant
/// - Reject a TTL that overflows the expiry as `Store(InvalidTtl)`
/// - Report an unreachable backend as `Store(Unavailable)`, never as a miss
/// - Make `compare_and_swap` atomic with respect to other writers of the key
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Fetch a live entry. `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    /// A non-positive `ttl` stores an already-expired entry.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error>;

    /// Delete `key` if present.
    async fn remove(&self, key: &str) -> Result<(), Error>;

    /// Replace the entry only if its current live value equals `expected`.
    ///
    /// # Returns
    ///
    /// `true` if the swap happened, `false` if the entry changed or vanished.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, Error>;
}

#[async_trait]
impl<C: CacheProvider + ?Sized> CacheProvider for Arc<C> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        (**self).put(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        (**self).remove(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, Error> {
        (**self).compare_and_swap(key, expected, value, ttl).await
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Live up to and including `expires_at`.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

fn expires_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, Error> {
    now.checked_add_signed(ttl).ok_or_else(|| {
        store_error(StoreErrorKind::InvalidTtl, &format!("ttl of {} is out of range", ttl))
    })
}

/// Process-local cache with per-entry TTL.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries.
    ///
    /// Reads already skip expired entries; call this periodically to reclaim memory.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let now = self.clock.now();
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        let expires_at = expires_after(self.clock.now(), ttl)?;
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, Error> {
        let now = self.clock.now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if current.is_expired(now) || current.value != expected {
                    return Ok(false);
                }
                occupied.insert(CacheEntry {
                    value,
                    expires_at: expires_after(now, ttl)?,
                });
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }
}
