//! The resolver: owns the collaborators and hands out document records.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::info;

use crate::extract::{standard_capabilities, ExtractionEngine};
use crate::fetchers::HttpFetcher;
use crate::pipeline::document::Document;
use crate::stores::{LocalArchive, MemoryCache};
use crate::traits::extractor::Capabilities;
use crate::traits::fetcher::Fetcher;
use crate::traits::store::{ArchiveStore, TextCache};
use crate::types::config::ResolverConfig;
use crate::types::document::{DocumentResult, ResolveOptions};

/// Collaborators shared by every document of a resolver.
pub(crate) struct Shared {
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) document_cache: Arc<dyn TextCache>,
    pub(crate) archive: Option<Arc<dyn ArchiveStore>>,
    pub(crate) engine: ExtractionEngine,
    pub(crate) config: ResolverConfig,
}

/// Resolves URLs into [`DocumentResult`]s.
///
/// Documents created by one resolver share its caches, so a URL resolved
/// once is served from the cache afterwards.
///
/// # Example
///
/// ```rust,ignore
/// use citeit_document::{Resolver, ResolveOptions};
///
/// let resolver = Resolver::builder().with_standard_capabilities().build();
/// let result = resolver.resolve("https://example.com/a", ResolveOptions::default()).await;
/// println!("{}", result.text);
/// ```
#[derive(Clone)]
pub struct Resolver {
    shared: Arc<Shared>,
}

impl Resolver {
    /// Resolver with default configuration and every standard capability.
    pub fn new() -> Self {
        Self::builder().with_standard_capabilities().build()
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.shared.config
    }

    pub fn engine(&self) -> &ExtractionEngine {
        &self.shared.engine
    }

    /// A fresh document record for `url`. Nothing is fetched until an
    /// accessor is called.
    pub fn document(&self, url: impl Into<String>) -> Document {
        Document::new(url, Arc::clone(&self.shared))
    }

    /// Resolve one URL completely.
    pub async fn resolve(&self, url: &str, options: ResolveOptions) -> DocumentResult {
        self.document(url).get_metadata(options).await
    }

    /// Resolve several URLs with at most `max_concurrent_downloads` in
    /// flight. Results keep the input order.
    pub async fn resolve_many<I, S>(&self, urls: I, options: ResolveOptions) -> Vec<DocumentResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        let workers = self.shared.config.max_concurrent_downloads.max(1);
        info!(urls = urls.len(), workers = workers, "Resolving batch");

        stream::iter(urls)
            .map(|url| async move { self.document(url).get_metadata(options).await })
            .buffered(workers)
            .collect()
            .await
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("fetcher", &self.shared.fetcher.name())
            .field("engine", &self.shared.engine)
            .field("archive", &self.shared.archive.is_some())
            .finish()
    }
}

/// Builder for [`Resolver`].
///
/// Unset collaborators get defaults: an [`HttpFetcher`] built from the
/// config, in-memory caches sized by `cache_capacity` and, when
/// `save_downloads` is on, a [`LocalArchive`] under `downloads_root`.
#[derive(Default)]
pub struct ResolverBuilder {
    config: ResolverConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    document_cache: Option<Arc<dyn TextCache>>,
    transcript_cache: Option<Arc<dyn TextCache>>,
    archive: Option<Arc<dyn ArchiveStore>>,
    capabilities: Capabilities,
}

impl ResolverBuilder {
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Cache for document text, keyed by protocol-stripped URL.
    pub fn with_document_cache(mut self, cache: Arc<dyn TextCache>) -> Self {
        self.document_cache = Some(cache);
        self
    }

    /// Cache for provider transcripts, keyed by `<provider>:<id>`.
    pub fn with_transcript_cache(mut self, cache: Arc<dyn TextCache>) -> Self {
        self.transcript_cache = Some(cache);
        self
    }

    /// Archive for downloads and text artifacts. Only written when
    /// `save_downloads` is on.
    pub fn with_archive(mut self, archive: Arc<dyn ArchiveStore>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// PDF text, OCR, YouTube captions and Oyez transcripts.
    pub fn with_standard_capabilities(mut self) -> Self {
        self.capabilities = standard_capabilities();
        self
    }

    pub fn build(self) -> Resolver {
        let config = self.config;

        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::from_config(&config)));
        let document_cache = self
            .document_cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new(config.cache_capacity)));
        let transcript_cache = self
            .transcript_cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new(config.cache_capacity)));

        let archive = if config.save_downloads {
            Some(
                self.archive
                    .unwrap_or_else(|| Arc::new(LocalArchive::new(&config.downloads_root))),
            )
        } else {
            None
        };

        let mut engine = ExtractionEngine::new(self.capabilities)
            .with_config(&config)
            .with_transcript_cache(transcript_cache);
        if let Some(archive) = &archive {
            engine = engine.with_archive(Arc::clone(archive));
        }

        info!(
            fetcher = fetcher.name(),
            capabilities = ?engine.capabilities().describe(),
            save_downloads = config.save_downloads,
            "Resolver ready"
        );

        Resolver {
            shared: Arc::new(Shared {
                fetcher,
                document_cache,
                archive,
                engine,
                config,
            }),
        }
    }
}
