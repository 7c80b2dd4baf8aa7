//! Cache of resolved value pages.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::response::ValuesPage;

/// Storage for resolved pages, keyed by logical request key.
///
/// Implementations are shared by every concurrent resolution and must be safe
/// for concurrent reads and writes.
pub trait CacheProvider: Send + Sync {
    /// A live entry, if any. Expired entries are never returned.
    fn get(&self, key: &str) -> Option<ValuesPage>;

    /// Store `page`; `ttl` of `None` means no expiry.
    fn set(&self, key: &str, page: ValuesPage, ttl: Option<Duration>);

    /// Remove one entry, returning whether it existed.
    fn delete(&self, key: &str) -> bool;

    /// Remove every entry whose key starts with `prefix`, returning how many
    /// were removed.
    fn delete_prefix(&self, prefix: &str) -> usize;

    fn clear(&self);

    fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    page: ValuesPage,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Process-local cache on a concurrent hash map. Expiry uses the tokio clock,
/// and expired entries are evicted when next read.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict every expired entry now.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

impl CacheProvider for InMemoryCache {
    fn get(&self, key: &str) -> Option<ValuesPage> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if !entry.is_expired(now) {
            return Some(entry.page.clone());
        }
        drop(entry);
        trace!(key, "evicting expired cache entry");
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    fn set(&self, key: &str, page: ValuesPage, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), CacheEntry { page, expires_at });
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn delete_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
