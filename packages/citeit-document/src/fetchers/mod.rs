//! Fetcher implementations.
//!
//! # Available Fetchers
//!
//! - `HttpFetcher` - reqwest with retry, content-type fallback and charset
//!   resolution
//! - `RateLimitedFetcher` - governor-based politeness wrapper
//! - `MockFetcher` - For testing
//!
//! # Example
//!
//! ```rust,ignore
//! use citeit_document::fetchers::{FetcherExt, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new().rate_limited(2);
//! let resource = fetcher.fetch("https://example.com/a").await?;
//! ```

mod http;
mod mock;
mod rate_limited;

pub use http::{content_type_or_fallback, HttpFetcher, FALLBACK_CONTENT_TYPE};
pub use mock::MockFetcher;
pub use rate_limited::{FetcherExt, RateLimitedFetcher, RateLimitedFetcherBuilder};

// Re-export from traits for convenience
pub use crate::traits::fetcher::Fetcher;
