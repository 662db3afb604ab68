//! Fetcher trait for pluggable network retrieval.
//!
//! A fetcher returns the whole response (status, headers, body, resolved
//! charset) in one value. Classification and decoding then run purely over
//! that value.
//!
//! # Usage
//!
//! ```rust,ignore
//! use citeit_document::traits::fetcher::Fetcher;
//!
//! let resource = fetcher.fetch("https://example.com/a").await?;
//! println!("{} bytes of {}", resource.content_length(), resource.content_type);
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::types::resource::FetchedResource;

/// Fetcher trait for retrieving a single URL.
///
/// Implementations:
/// - `HttpFetcher` - reqwest with retry and encoding resolution
/// - `RateLimitedFetcher` - politeness wrapper around any fetcher
/// - `MockFetcher` - canned responses for tests
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a URL.
    ///
    /// Transient failures are retried inside the fetcher; an `Err` is final.
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
