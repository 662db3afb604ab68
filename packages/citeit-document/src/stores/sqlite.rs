//! SQLite text cache.
//!
//! A file-based cache that survives restarts. Writes use
//! `INSERT OR REPLACE`, so two workers resolving the same URL can both
//! store their result without conflict.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;

use crate::error::{DocumentError, Result};
use crate::traits::store::TextCache;
use crate::types::cache::CacheEntry;

/// SQLite-backed text cache.
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Create a new SQLite cache with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://./citeit.db?mode=rwc` - Create if not exists
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(DocumentError::storage)?;

        let cache = Self { pool };
        cache.run_migrations().await?;
        Ok(cache)
    }

    /// Create an in-memory SQLite cache (for testing).
    pub async fn in_memory() -> Result<Self> {
        // One connection: every pooled connection to `:memory:` is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(DocumentError::storage)?;

        let cache = Self { pool };
        cache.run_migrations().await?;
        Ok(cache)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS text_cache (
                key TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                raw TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                content_hash TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(DocumentError::storage)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct EntryRow {
    key: String,
    text: String,
    raw: Option<String>,
    metadata: String,
    content_hash: String,
    stored_at: String,
}

impl EntryRow {
    fn into_entry(self) -> Result<CacheEntry> {
        let stored_at = chrono::DateTime::parse_from_rfc3339(&self.stored_at)
            .map_err(DocumentError::storage)?
            .with_timezone(&chrono::Utc);

        let metadata: HashMap<String, String> = serde_json::from_str(&self.metadata)?;

        Ok(CacheEntry {
            key: self.key,
            text: self.text,
            raw: self.raw,
            metadata,
            content_hash: self.content_hash,
            stored_at,
        })
    }
}

#[async_trait]
impl TextCache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(
            "SELECT key, text, raw, metadata, content_hash, stored_at FROM text_cache WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(DocumentError::storage)?;

        row.map(EntryRow::into_entry).transpose()
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        let metadata = serde_json::to_string(&entry.metadata)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO text_cache (key, text, raw, metadata, content_hash, stored_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.text)
        .bind(&entry.raw)
        .bind(&metadata)
        .bind(&entry.content_hash)
        .bind(entry.stored_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(DocumentError::storage)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cache::keys;

    #[tokio::test]
    async fn test_round_trip() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let entry = CacheEntry::new("example.com/a", "Hello World")
            .with_raw("<p>Hello World</p>")
            .with_metadata(keys::DOC_TYPE, "html");

        cache.put(&entry).await.unwrap();

        let stored = cache.get("example.com/a").await.unwrap().unwrap();
        assert_eq!(stored.text, "Hello World");
        assert_eq!(stored.raw.as_deref(), Some("<p>Hello World</p>"));
        assert_eq!(stored.meta(keys::DOC_TYPE), "html");
        assert_eq!(stored.content_hash, entry.content_hash);
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let cache = SqliteCache::in_memory().await.unwrap();
        let entry = CacheEntry::new("youtube:abc", "transcript");

        cache.put(&entry).await.unwrap();
        cache.put(&entry).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM text_cache")
            .fetch_one(cache.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
        assert!(cache.get("youtube:missing").await.unwrap().is_none());
    }
}
