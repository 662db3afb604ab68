//! Mock fetcher for testing.
//!
//! Serves canned responses and records every requested URL, so tests can
//! assert how many network round trips a resolution made.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::Fetcher;
use crate::types::resource::FetchedResource;

/// Mock fetcher for testing.
///
/// # Example
///
/// ```rust
/// use citeit_document::fetchers::MockFetcher;
///
/// let mock = MockFetcher::new()
///     .with_html("https://example.com/a", "<p>Hello</p>")
///     .with_failure("https://down.example.com/");
/// assert_eq!(mock.fetch_count(), 0);
/// ```
#[derive(Default)]
pub struct MockFetcher {
    /// Canned responses indexed by URL
    responses: Arc<RwLock<HashMap<String, FetchedResource>>>,
    /// URLs that fail with a connection error
    failures: Arc<RwLock<HashSet<String>>>,
    /// Every URL requested, in order
    calls: Arc<RwLock<Vec<String>>>,
    /// Simulated network latency
    delay: Option<Duration>,
}

impl MockFetcher {
    /// Create a new empty mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a canned response, keyed by its `url`.
    pub fn add_resource(&self, resource: FetchedResource) {
        self.responses
            .write()
            .unwrap()
            .insert(resource.url.clone(), resource);
    }

    /// Add a canned response (builder pattern).
    pub fn with_resource(self, resource: FetchedResource) -> Self {
        self.add_resource(resource);
        self
    }

    /// Add a response with an explicit content type.
    pub fn with_response(
        self,
        url: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.with_resource(FetchedResource::new(url, content_type, body))
    }

    /// Add a `text/html` response.
    pub fn with_html(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_response(url, "text/html; charset=utf-8", html.into().into_bytes())
    }

    /// Make a URL fail with a connection error.
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.failures.write().unwrap().insert(url.into());
        self
    }

    /// Delay every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of fetches.
    pub fn fetch_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Number of fetches of one URL.
    pub fn fetch_count_for(&self, url: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    /// Get the URLs that were requested.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Clear all recorded calls.
    pub fn reset_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

impl Clone for MockFetcher {
    fn clone(&self) -> Self {
        Self {
            responses: Arc::clone(&self.responses),
            failures: Arc::clone(&self.failures),
            calls: Arc::clone(&self.calls),
            delay: self.delay,
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource> {
        self.calls.write().unwrap().push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "unparseable".to_string(),
            });
        }

        if self.failures.read().unwrap().contains(url) {
            return Err(FetchError::Connection {
                url: url.to_string(),
                attempts: 1,
                source: "connection refused".into(),
            });
        }

        let response = self.responses.read().unwrap().get(url).cloned();
        response.ok_or_else(|| FetchError::Connection {
            url: url.to_string(),
            attempts: 1,
            source: "no canned response".into(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_response_and_tracking() {
        let mock = MockFetcher::new().with_html("https://example.com/a", "<p>Hi</p>");

        let resource = mock.fetch("https://example.com/a").await.unwrap();
        assert_eq!(resource.body, b"<p>Hi</p>");
        assert!(resource.content_type.starts_with("text/html"));

        let _ = mock.fetch("https://example.com/a").await;
        assert_eq!(mock.fetch_count_for("https://example.com/a"), 2);
    }

    #[tokio::test]
    async fn test_failures() {
        let mock = MockFetcher::new().with_failure("https://down.example.com/");

        let err = mock.fetch("https://down.example.com/").await.unwrap_err();
        assert!(matches!(err, FetchError::Connection { .. }));

        let err = mock.fetch("https://unknown.example.com/").await.unwrap_err();
        assert!(matches!(err, FetchError::Connection { .. }));
        assert_eq!(mock.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let mock = MockFetcher::new().with_html("https://example.com/", "x");
        let clone = mock.clone();
        clone.fetch("https://example.com/").await.unwrap();
        assert_eq!(mock.fetch_count(), 1);
    }
}
