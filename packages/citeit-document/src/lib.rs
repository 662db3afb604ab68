//! Document Resolution & Text-Extraction
//!
//! Turns the URL of a quoted source into a canonical identity, a document
//! type and normalized plain text, caching the result so a source is
//! downloaded and processed once.
//!
//! # Design Philosophy
//!
//! - One fetch per document, memoized accessors, never a second "peek"
//! - Extraction never fails: text, a placeholder, or a diagnostic
//! - Collaborators (network, caches, archive, OCR, transcripts) are traits
//! - Errors are state on the document, not panics in the caller
//!
//! # Usage
//!
//! ```rust,ignore
//! use citeit_document::{Resolver, ResolveOptions};
//! use citeit_document::testing::MockFetcher;
//!
//! let fetcher = MockFetcher::new()
//!     .with_html("https://example.com/a", "<body>  Hello   World  </body>");
//! let resolver = Resolver::builder().with_fetcher(fetcher).build();
//!
//! let doc = resolver.document("https://example.com/a");
//! assert_eq!(doc.get_text().await, "Hello World");
//! assert_eq!(doc.download_count(), 1);
//!
//! let result = resolver.resolve("https://example.com/a", ResolveOptions::verbose()).await;
//! assert_eq!(result.num_downloads, Some(0)); // served from the cache
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - URL validation, canonical discovery, archive naming
//! - [`provider`] - Transcript-bearing hosts (YouTube, Vimeo, SoundCloud, Oyez)
//! - [`charset`] - Encoding resolution, decoding, mojibake repair
//! - [`lang`] - Language detection
//! - [`traits`] - Fetcher, cache, archive and extraction capability traits
//! - [`fetchers`] - HTTP, rate-limited and mock fetchers
//! - [`stores`] - Memory, filesystem and SQLite stores
//! - [`extract`] - Extraction engine and strategies
//! - [`pipeline`] - Document records and the resolver
//! - [`testing`] - Mock implementations for testing

pub mod canonical;
pub mod charset;
pub mod error;
pub mod extract;
pub mod fetchers;
pub mod lang;
pub mod pipeline;
pub mod provider;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{DocumentError, ErrorKind, FetchError, LastError};
pub use traits::{
    extractor::{Capabilities, OcrEngine, PdfTextExtractor, SubtitleSource, TranscriptSource},
    fetcher::Fetcher,
    store::{ArchiveStore, TextCache},
};
pub use types::{
    cache::CacheEntry,
    config::{ResolverConfig, RetryPolicy, DEFAULT_USER_AGENT},
    doc_type::{classify, AudioFormat, DocType, ImageFormat},
    document::{DocumentResult, DocumentState, ResolveOptions},
    resource::FetchedResource,
};

pub use canonical::{citeit_url, normalize, strip_protocol, NormalizedUrl};
pub use lang::detect_language;
pub use provider::{route, Provider, ProviderKey};

// Re-export pipeline
pub use extract::{standard_capabilities, ExtractionEngine, ExtractionOutcome};
pub use pipeline::{Document, Resolver, ResolverBuilder};

// Re-export fetchers and stores
pub use fetchers::{FetcherExt, HttpFetcher, RateLimitedFetcher};
pub use stores::{LocalArchive, MemoryArchive, MemoryCache};

#[cfg(feature = "sqlite")]
pub use stores::SqliteCache;

// Re-export testing utilities
pub use testing::{MockFetcher, MockOcr, MockPdfText, MockSubtitles, MockTranscripts};
