//! Rate-limited fetcher wrapper.
//!
//! Wraps any Fetcher with a governor rate limiter, so a batch of citations
//! pointing at one site does not hammer it.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::traits::fetcher::Fetcher;
use crate::types::resource::FetchedResource;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Zero rates are clamped to one request per second.
fn per_second(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(nonzero!(1u32))
}

/// A fetcher wrapper that enforces rate limits.
pub struct RateLimitedFetcher<F: Fetcher> {
    inner: F,
    limiter: Arc<DefaultRateLimiter>,
}

impl<F: Fetcher> RateLimitedFetcher<F> {
    /// Create a new rate-limited fetcher.
    pub fn new(fetcher: F, requests_per_second: u32) -> Self {
        Self::with_quota(fetcher, Quota::per_second(per_second(requests_per_second)))
    }

    /// Create with a custom quota.
    pub fn with_quota(fetcher: F, quota: Quota) -> Self {
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with burst support.
    pub fn with_burst(fetcher: F, requests_per_second: u32, burst: u32) -> Self {
        let quota =
            Quota::per_second(per_second(requests_per_second)).allow_burst(per_second(burst));
        Self::with_quota(fetcher, quota)
    }

    /// The wrapped fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Builder for RateLimitedFetcher.
pub struct RateLimitedFetcherBuilder<F: Fetcher> {
    fetcher: F,
    requests_per_second: u32,
    burst: Option<u32>,
}

impl<F: Fetcher> RateLimitedFetcherBuilder<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            requests_per_second: 1,
            burst: None,
        }
    }

    /// Set requests per second.
    pub fn requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }

    /// Set burst size.
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = Some(burst);
        self
    }

    pub fn build(self) -> RateLimitedFetcher<F> {
        match self.burst {
            Some(burst) => {
                RateLimitedFetcher::with_burst(self.fetcher, self.requests_per_second, burst)
            }
            None => RateLimitedFetcher::new(self.fetcher, self.requests_per_second),
        }
    }
}

/// Extension trait for easy rate limiting.
pub trait FetcherExt: Fetcher + Sized {
    /// Wrap this fetcher with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedFetcher<Self> {
        RateLimitedFetcher::new(self, requests_per_second)
    }
}

impl<F: Fetcher + Sized> FetcherExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::time::Instant;

    #[tokio::test]
    async fn test_rate_limiting() {
        let mock = MockFetcher::new()
            .with_html("https://example.com/1", "<p>1</p>")
            .with_html("https://example.com/2", "<p>2</p>")
            .with_html("https://example.com/3", "<p>3</p>");

        let fetcher = mock.rate_limited(2);
        let start = Instant::now();

        for n in 1..=3 {
            fetcher
                .fetch(&format!("https://example.com/{n}"))
                .await
                .unwrap();
        }

        // The quota allows a burst of two; the third request waits ~500ms.
        assert!(start.elapsed().as_millis() >= 400, "{:?}", start.elapsed());
        assert_eq!(fetcher.inner().fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_builder_with_burst() {
        let fetcher = RateLimitedFetcherBuilder::new(
            MockFetcher::new().with_html("https://example.com/", "<p>x</p>"),
        )
        .requests_per_second(1)
        .burst(5)
        .build();

        let start = Instant::now();
        for _ in 0..3 {
            fetcher.fetch("https://example.com/").await.unwrap();
        }
        assert!(start.elapsed().as_millis() < 500);
        assert_eq!(fetcher.name(), "mock");
    }
}
