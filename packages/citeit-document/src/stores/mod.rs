//! Storage implementations.
//!
//! Available backends:
//! - `MemoryCache` - Bounded LRU text cache (always available)
//! - `MemoryArchive` - In-memory archive (always available)
//! - `LocalArchive` - Filesystem archive under a downloads root
//! - `SqliteCache` - SQLite text cache (requires `sqlite` feature)

pub mod local;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use local::LocalArchive;
pub use memory::{ArchivedPayload, MemoryArchive, MemoryCache};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCache;
