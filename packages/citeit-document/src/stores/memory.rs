//! In-memory storage implementations.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use crate::error::Result;
use crate::traits::store::{ArchiveStore, TextCache};
use crate::types::cache::CacheEntry;

/// Bounded in-memory text cache with least-recently-used eviction.
///
/// Entries live in insertion order inside an `IndexMap`; a read moves the
/// entry to the back, so the front is always the eviction candidate.
pub struct MemoryCache {
    entries: Mutex<IndexMap<String, CacheEntry>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(500)
    }
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries. A capacity of
    /// zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::with_capacity(capacity.min(1024))),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lookups that found an entry.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Cached keys, least recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[async_trait]
impl TextCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.shift_remove(key) {
            Some(entry) => {
                entries.insert(key.to_string(), entry.clone());
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }

        let mut entries = self.entries.lock().unwrap();
        entries.shift_remove(&entry.key);
        entries.insert(entry.key.clone(), entry.clone());
        while entries.len() > self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                tracing::debug!(key = %evicted, "Evicted cache entry");
            }
        }
        Ok(())
    }
}

/// A stored archive payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory archive for testing and development.
#[derive(Default)]
pub struct MemoryArchive {
    payloads: RwLock<HashMap<String, ArchivedPayload>>,
    writes: AtomicU64,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archived keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.payloads.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Payload stored under a key.
    pub fn payload(&self, key: &str) -> Option<ArchivedPayload> {
        self.payloads.read().unwrap().get(key).cloned()
    }

    /// Total writes performed, including overwrites.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchive {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.payloads.read().unwrap().contains_key(key))
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .payloads
            .read()
            .unwrap()
            .get(key)
            .map(|p| p.bytes.clone()))
    }

    async fn write(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        self.payloads.write().unwrap().insert(
            key.to_string(),
            ArchivedPayload {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let cache = MemoryCache::new(10);
        cache.put(&CacheEntry::new("example.com/a", "Hello World")).await.unwrap();

        let entry = cache.get("example.com/a").await.unwrap().unwrap();
        assert_eq!(entry.text, "Hello World");
        assert!(cache.get("example.com/b").await.unwrap().is_none());
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        cache.put(&CacheEntry::new("a", "1")).await.unwrap();
        cache.put(&CacheEntry::new("b", "2")).await.unwrap();

        // Touch "a" so "b" becomes the oldest.
        cache.get("a").await.unwrap();
        cache.put(&CacheEntry::new("c", "3")).await.unwrap();

        assert_eq!(cache.keys(), vec!["a".to_string(), "c".to_string()]);
        assert!(cache.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_entry() {
        let cache = MemoryCache::new(5);
        cache.put(&CacheEntry::new("a", "old")).await.unwrap();
        cache.put(&CacheEntry::new("a", "new")).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").await.unwrap().unwrap().text, "new");
    }

    #[tokio::test]
    async fn test_zero_capacity_disables() {
        let cache = MemoryCache::new(0);
        cache.put(&CacheEntry::new("a", "1")).await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_archive_write_if_absent() {
        let archive = MemoryArchive::new();
        assert!(archive.write_if_absent("html/a", b"one", "text/html").await.unwrap());
        assert!(!archive.write_if_absent("html/a", b"two", "text/html").await.unwrap());

        assert_eq!(archive.read("html/a").await.unwrap().unwrap(), b"one");
        assert_eq!(archive.write_count(), 1);
        assert_eq!(archive.payload("html/a").unwrap().content_type, "text/html");
    }
}
