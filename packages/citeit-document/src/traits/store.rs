//! Storage traits for cached text and archived payloads.
//!
//! - `TextCache`: extracted text keyed by protocol-stripped URL or by a
//!   provider key such as `youtube:<id>`
//! - `ArchiveStore`: raw downloads and text artifacts, keyed by archive path
//!
//! Implementations must tolerate concurrent readers and racing writers of
//! the same key; the last complete write wins.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::cache::CacheEntry;

/// Cache for extracted text.
#[async_trait]
pub trait TextCache: Send + Sync {
    /// Get a cached entry by key.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Store an entry under `entry.key`.
    async fn put(&self, entry: &CacheEntry) -> Result<()>;

    /// Store several entries.
    async fn put_all(&self, entries: &[CacheEntry]) -> Result<()> {
        for entry in entries {
            self.put(entry).await?;
        }
        Ok(())
    }

    /// Check whether a key is cached.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Store for archived payloads.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Check if a payload exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read a payload.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a payload, replacing any previous one.
    async fn write(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    /// Write a payload unless one already exists. Returns whether a write
    /// happened.
    async fn write_if_absent(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<bool> {
        if self.exists(key).await? {
            return Ok(false);
        }
        self.write(key, bytes, content_type).await?;
        Ok(true)
    }
}

#[async_trait]
impl<T: TextCache + ?Sized> TextCache for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        (**self).get(key).await
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        (**self).put(entry).await
    }
}

#[async_trait]
impl<A: ArchiveStore + ?Sized> ArchiveStore for Arc<A> {
    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        (**self).write(key, bytes, content_type).await
    }
}
