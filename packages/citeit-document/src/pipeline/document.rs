//! The document record: one resolution request, memoized stage by stage.
//!
//! Stages run at most once per instance. The fetch stage covers URL
//! validation, the document cache lookup, the network round trip,
//! classification, decoding, canonical discovery and archival. The text
//! stage runs extraction and writes the cache. Accessors only read the
//! memoized results, so calling them repeatedly never repeats I/O.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::canonical::{archive_path, canonicalize_at, citeit_url, normalize, NormalizedUrl};
use crate::charset::decode;
use crate::error::{DocumentError, LastError};
use crate::extract::ExtractionInput;
use crate::lang::detect_language;
use crate::pipeline::resolver::Shared;
use crate::types::cache::{keys, CacheEntry};
use crate::types::doc_type::{classify, DocType};
use crate::types::document::{DocumentResult, DocumentState, ResolveOptions};

/// Output of the fetch stage.
#[derive(Debug, Clone)]
struct Fetched {
    /// Source URL passed validation and a fetch or cache hit succeeded
    ok: bool,
    /// Protocol-stripped source URL, the pre-fetch cache key
    source_key: String,
    content_type: String,
    doc_type: DocType,
    encoding: String,
    /// Decoded body, empty for binary types
    raw: String,
    body: Vec<u8>,
    /// Protocol-stripped canonical URL, empty when unresolvable
    canonical_url: String,
    /// Present when the document cache answered
    cached: Option<CacheEntry>,
}

impl Fetched {
    fn failed() -> Self {
        Self {
            ok: false,
            source_key: String::new(),
            content_type: String::new(),
            doc_type: DocType::Html,
            encoding: String::new(),
            raw: String::new(),
            body: Vec::new(),
            canonical_url: String::new(),
            cached: None,
        }
    }

    fn from_cache(normalized: &NormalizedUrl, entry: CacheEntry) -> Self {
        let content_type = entry.meta(keys::CONTENT_TYPE).to_string();
        let doc_type = match entry.meta(keys::DOC_TYPE) {
            "" => classify(&content_type),
            tag => tag.parse().unwrap_or(DocType::Html),
        };
        let canonical_url = match entry.meta(keys::CANONICAL_URL) {
            "" => normalized.key().to_string(),
            canonical => canonical.to_string(),
        };

        Self {
            ok: true,
            source_key: normalized.key().to_string(),
            encoding: entry.meta(keys::ENCODING).to_string(),
            raw: entry.raw.clone().unwrap_or_default(),
            body: Vec::new(),
            content_type,
            doc_type,
            canonical_url,
            cached: Some(entry),
        }
    }
}

/// Output of the text stage.
#[derive(Debug, Clone)]
struct Extracted {
    text: String,
    language: String,
    request_stop: DateTime<Utc>,
}

/// A single resolution request.
///
/// Created by [`Resolver::document`](crate::pipeline::Resolver::document).
/// Text accessors never fail: a failed fetch yields empty values and sets
/// [`last_error`](Document::last_error).
pub struct Document {
    url: String,
    shared: Arc<Shared>,
    request_start: DateTime<Utc>,
    fetched: OnceCell<Fetched>,
    extracted: OnceCell<Extracted>,
    download_count: AtomicU32,
    state: Mutex<DocumentState>,
    last_error: Mutex<Option<LastError>>,
}

impl Document {
    pub(crate) fn new(url: impl Into<String>, shared: Arc<Shared>) -> Self {
        Self {
            url: url.into(),
            shared,
            request_start: Utc::now(),
            fetched: OnceCell::new(),
            extracted: OnceCell::new(),
            download_count: AtomicU32::new(0),
            state: Mutex::new(DocumentState::New),
            last_error: Mutex::new(None),
        }
    }

    /// URL as supplied.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> DocumentState {
        *self.state.lock().unwrap()
    }

    /// Network fetches performed by this instance. At most one.
    pub fn download_count(&self) -> u32 {
        self.download_count.load(Ordering::SeqCst)
    }

    /// The most recent error, if any stage reported one.
    pub fn last_error(&self) -> Option<LastError> {
        self.last_error.lock().unwrap().clone()
    }

    pub fn request_start(&self) -> DateTime<Utc> {
        self.request_start
    }

    /// Extracted, normalized text. Never absent.
    pub async fn get_text(&self) -> String {
        self.extracted().await.text.clone()
    }

    /// Canonical URL without protocol, empty when the fetch failed.
    pub async fn get_canonical_url(&self) -> String {
        self.fetched().await.canonical_url.clone()
    }

    /// Identity used for citation lookup, empty when the fetch failed.
    pub async fn get_citeit_url(&self) -> String {
        let canonical = &self.fetched().await.canonical_url;
        if canonical.is_empty() {
            return String::new();
        }
        citeit_url(canonical)
    }

    pub async fn get_doc_type(&self) -> DocType {
        self.fetched().await.doc_type.clone()
    }

    pub async fn get_content_type(&self) -> String {
        self.fetched().await.content_type.clone()
    }

    pub async fn get_encoding(&self) -> String {
        self.fetched().await.encoding.clone()
    }

    /// ISO 639-1 code of the text, empty when unknown.
    pub async fn get_language(&self) -> String {
        self.extracted().await.language.clone()
    }

    /// Decoded source text, empty for binary sources.
    pub async fn get_raw(&self) -> String {
        self.fetched().await.raw.clone()
    }

    /// Resolve fully and return the data view.
    pub async fn get_metadata(&self, options: ResolveOptions) -> DocumentResult {
        let extracted = self.extracted().await;
        let fetched = self.fetched().await;

        let request_stop = extracted.request_stop;
        let elapsed = request_stop - self.request_start;
        let elapsed_time = elapsed
            .num_microseconds()
            .map_or(0.0, |us| us as f64 / 1_000_000.0)
            .max(0.0);

        DocumentResult {
            url: self.url.clone(),
            canonical_url: fetched.canonical_url.clone(),
            citeit_url: self.get_citeit_url().await,
            doc_type: fetched.doc_type.clone(),
            content_type: fetched.content_type.clone(),
            language: extracted.language.clone(),
            encoding: fetched.encoding.clone(),
            text: extracted.text.clone(),
            raw: fetched.raw.clone(),
            request_start: self.request_start,
            request_stop: Some(request_stop),
            elapsed_time,
            num_downloads: options.verbose.then(|| self.download_count()),
            error: self.last_error(),
        }
    }

    fn set_state(&self, state: DocumentState) {
        debug!(url = %self.url, state = ?state, "Document state");
        *self.state.lock().unwrap() = state;
    }

    fn record_error(&self, err: &DocumentError) {
        *self.last_error.lock().unwrap() = Some(LastError::from(err));
    }

    async fn fetched(&self) -> &Fetched {
        self.fetched.get_or_init(|| self.fetch_stage()).await
    }

    async fn extracted(&self) -> &Extracted {
        self.extracted.get_or_init(|| self.text_stage()).await
    }

    async fn fetch_stage(&self) -> Fetched {
        self.set_state(DocumentState::Classifying);

        let normalized = match normalize(&self.url) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Rejected URL");
                self.record_error(&e);
                self.set_state(DocumentState::Fetched { ok: false });
                return Fetched::failed();
            }
        };

        match self.shared.document_cache.get(normalized.key()).await {
            Ok(Some(entry)) => {
                info!(url = %self.url, key = %normalized.key(), "Document cache hit");
                self.set_state(DocumentState::Fetched { ok: true });
                return Fetched::from_cache(&normalized, entry);
            }
            Ok(None) => {}
            Err(e) => warn!(key = %normalized.key(), error = %e, "Document cache read failed"),
        }

        self.set_state(DocumentState::Fetching);
        let resource = match self.shared.fetcher.fetch(normalized.as_str()).await {
            Ok(resource) => resource,
            Err(e) => {
                let e = DocumentError::from(e);
                warn!(url = %self.url, error = %e, "Fetch failed");
                self.record_error(&e);
                self.set_state(DocumentState::Fetched { ok: false });
                return Fetched {
                    source_key: normalized.key().to_string(),
                    ..Fetched::failed()
                };
            }
        };
        self.download_count.fetch_add(1, Ordering::SeqCst);

        let doc_type = classify(&resource.content_type);
        let (raw, encoding) = if doc_type.is_textual() {
            let decoded = decode(&resource.body, &resource.encoding);
            if decoded.unknown_label {
                self.record_error(&DocumentError::Encoding {
                    label: resource.encoding.clone(),
                });
            }
            (decoded.text, decoded.encoding)
        } else {
            (String::new(), resource.encoding.clone())
        };

        let canonical_url = match doc_type {
            DocType::Html => match Url::parse(&resource.final_url) {
                Ok(served) => canonicalize_at(normalized.url(), &served, &raw),
                Err(_) => canonicalize_at(normalized.url(), normalized.url(), &raw),
            },
            _ => normalized.key().to_string(),
        };
        debug!(
            url = %self.url,
            doc_type = %doc_type,
            encoding = %encoding,
            canonical = %canonical_url,
            "Classified"
        );

        if self.shared.config.save_downloads {
            self.archive_payload(&doc_type, &canonical_url, &raw, &resource.body, &resource.content_type)
                .await;
        }

        self.set_state(DocumentState::Fetched { ok: true });
        Fetched {
            ok: true,
            source_key: normalized.key().to_string(),
            content_type: resource.content_type,
            doc_type,
            encoding,
            raw,
            body: resource.body,
            canonical_url,
            cached: None,
        }
    }

    /// Archive the original payload once per canonical key. Textual types
    /// are written as decoded UTF-8.
    async fn archive_payload(
        &self,
        doc_type: &DocType,
        canonical_url: &str,
        raw: &str,
        body: &[u8],
        content_type: &str,
    ) {
        let Some(archive) = &self.shared.archive else {
            return;
        };
        let key = archive_path(doc_type, canonical_url);
        let bytes = if doc_type.is_textual() { raw.as_bytes() } else { body };

        match archive.write_if_absent(&key, bytes, content_type).await {
            Ok(true) => debug!(key = %key, bytes = bytes.len(), "Archived download"),
            Ok(false) => debug!(key = %key, "Archive exists, skipping"),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to archive download");
                self.record_error(&e);
            }
        }
    }

    async fn text_stage(&self) -> Extracted {
        let fetched = self.fetched().await;

        if let Some(entry) = &fetched.cached {
            let placeholder = entry.meta(keys::PLACEHOLDER) == "true";
            self.set_state(DocumentState::Resolved { placeholder });
            return Extracted {
                text: entry.text.clone(),
                language: entry.meta(keys::LANGUAGE).to_string(),
                request_stop: Utc::now(),
            };
        }

        if !fetched.ok {
            return Extracted {
                text: String::new(),
                language: String::new(),
                request_stop: Utc::now(),
            };
        }

        self.set_state(DocumentState::Extracting);
        let outcome = self
            .shared
            .engine
            .extract(ExtractionInput {
                doc_type: &fetched.doc_type,
                body: &fetched.body,
                text: &fetched.raw,
                url: &self.url,
                canonical_key: &fetched.canonical_url,
            })
            .await;

        if let Some(err) = outcome.error() {
            warn!(url = %self.url, error = %err, "Extraction unavailable");
            self.record_error(err);
        }
        let placeholder = outcome.is_placeholder();
        let cacheable = outcome.is_cacheable();
        let text = outcome.into_text();

        let language = if placeholder {
            None
        } else {
            detect_language(&text)
        }
        .or_else(|| detect_language(&fetched.raw))
        .unwrap_or_default();

        let extracted = Extracted {
            text,
            language,
            request_stop: Utc::now(),
        };

        if cacheable {
            self.store(fetched, &extracted, placeholder).await;
        }

        self.set_state(DocumentState::Resolved { placeholder });
        info!(
            url = %self.url,
            doc_type = %fetched.doc_type,
            chars = extracted.text.len(),
            placeholder = placeholder,
            "Resolved document"
        );
        extracted
    }

    /// Write the result under the source key and, when it differs, the
    /// canonical key.
    async fn store(&self, fetched: &Fetched, extracted: &Extracted, placeholder: bool) {
        let entry = CacheEntry::new(&fetched.source_key, &extracted.text)
            .with_raw(&fetched.raw)
            .with_metadata(keys::CANONICAL_URL, &fetched.canonical_url)
            .with_metadata(keys::CITEIT_URL, citeit_url(&fetched.canonical_url))
            .with_metadata(keys::CONTENT_TYPE, &fetched.content_type)
            .with_metadata(keys::DOC_TYPE, fetched.doc_type.tag())
            .with_metadata(keys::ENCODING, &fetched.encoding)
            .with_metadata(keys::LANGUAGE, &extracted.language)
            .with_metadata(keys::PLACEHOLDER, placeholder.to_string())
            .with_metadata(keys::REQUEST_STOP, extracted.request_stop.to_rfc3339());

        let mut entries = Vec::with_capacity(2);
        if fetched.canonical_url != fetched.source_key {
            entries.push(entry.rekeyed(&fetched.canonical_url));
        }
        entries.push(entry);

        if let Err(e) = self.shared.document_cache.put_all(&entries).await {
            warn!(key = %fetched.source_key, error = %e, "Document cache write failed");
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url)
            .field("state", &self.state())
            .field("download_count", &self.download_count())
            .finish()
    }
}
