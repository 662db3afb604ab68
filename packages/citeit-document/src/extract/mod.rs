//! Text extraction engine.
//!
//! One strategy per [`DocType`], dispatched through an exhaustive `match`.
//! Extraction never fails: every path produces text, a designed
//! placeholder, or a diagnostic naming the missing capability.

pub mod html;
pub mod pdf;
pub mod text;
pub mod transcripts;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::canonical::text_path;
use crate::error::DocumentError;
use crate::stores::MemoryCache;
use crate::traits::extractor::Capabilities;
use crate::traits::store::{ArchiveStore, TextCache};
use crate::types::config::ResolverConfig;
use crate::types::doc_type::DocType;

pub use html::extract_html_text;
#[cfg(feature = "pdf")]
pub use pdf::LopdfExtractor;
pub use pdf::TesseractOcr;
pub use text::{convert_quotes_to_straight, normalize_text, normalize_whitespace};
pub use transcripts::{clean_vtt, flatten_oyez, OyezApi, YtDlpSubtitles};

/// Every capability this crate ships: `lopdf` digital text (with the `pdf`
/// feature), poppler/tesseract OCR, `yt-dlp` captions and the Oyez API.
///
/// The command-line tools are looked up on `PATH` when first used; a
/// missing tool surfaces as `ExtractionUnavailable` for that document.
pub fn standard_capabilities() -> Capabilities {
    let capabilities = Capabilities::none()
        .with_ocr(TesseractOcr::new())
        .with_subtitles(YtDlpSubtitles::new())
        .with_transcripts(OyezApi::new());

    #[cfg(feature = "pdf")]
    let capabilities = capabilities.with_pdf_text(LopdfExtractor);

    capabilities
}

/// Result of running an extraction strategy.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// Extracted text, possibly empty
    Text(String),
    /// Designed degraded response for a type without a strategy
    Placeholder(String),
    /// A capability was missing or failed; `notice` stands in for the text
    Unavailable { error: DocumentError, notice: String },
}

impl ExtractionOutcome {
    /// Capability missing from the engine.
    pub fn missing(capability: &str, notice: impl Into<String>) -> Self {
        ExtractionOutcome::Unavailable {
            error: DocumentError::ExtractionUnavailable {
                capability: capability.to_string(),
            },
            notice: notice.into(),
        }
    }

    /// The text shown to callers.
    pub fn text(&self) -> &str {
        match self {
            ExtractionOutcome::Text(text) | ExtractionOutcome::Placeholder(text) => text,
            ExtractionOutcome::Unavailable { notice, .. } => notice,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ExtractionOutcome::Text(text) | ExtractionOutcome::Placeholder(text) => text,
            ExtractionOutcome::Unavailable { notice, .. } => notice,
        }
    }

    /// Whether the text is a diagnostic rather than document content.
    pub fn is_placeholder(&self) -> bool {
        !matches!(self, ExtractionOutcome::Text(_))
    }

    /// Missing capabilities may be configured later, so their notices are
    /// not worth caching.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, ExtractionOutcome::Unavailable { .. })
    }

    pub fn error(&self) -> Option<&DocumentError> {
        match self {
            ExtractionOutcome::Unavailable { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Everything a strategy may need about one document.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    pub doc_type: &'a DocType,
    /// Raw payload
    pub body: &'a [u8],
    /// Decoded payload, empty for binary types
    pub text: &'a str,
    /// Source URL, used for provider routing
    pub url: &'a str,
    /// Protocol-stripped canonical URL, used for artifact names
    pub canonical_key: &'a str,
}

/// Dispatches documents to extraction strategies.
pub struct ExtractionEngine {
    capabilities: Capabilities,
    transcript_cache: Arc<dyn TextCache>,
    archive: Option<Arc<dyn ArchiveStore>>,
    ocr_page_timeout: Duration,
    ocr_language: String,
}

impl ExtractionEngine {
    /// Create an engine with the given capabilities and a private
    /// transcript cache.
    pub fn new(capabilities: Capabilities) -> Self {
        let defaults = ResolverConfig::default();
        Self {
            capabilities,
            transcript_cache: Arc::new(MemoryCache::new(defaults.cache_capacity)),
            archive: None,
            ocr_page_timeout: defaults.ocr_page_timeout,
            ocr_language: defaults.ocr_language,
        }
    }

    /// Apply OCR settings from resolver configuration.
    pub fn with_config(mut self, config: &ResolverConfig) -> Self {
        self.ocr_page_timeout = config.ocr_page_timeout;
        self.ocr_language = config.ocr_language.clone();
        self
    }

    /// Share a transcript cache.
    pub fn with_transcript_cache(mut self, cache: Arc<dyn TextCache>) -> Self {
        self.transcript_cache = cache;
        self
    }

    /// Write text artifacts to an archive.
    pub fn with_archive(mut self, archive: Arc<dyn ArchiveStore>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Run the strategy for `input.doc_type`.
    pub async fn extract(&self, input: ExtractionInput<'_>) -> ExtractionOutcome {
        debug!(url = %input.url, doc_type = %input.doc_type, bytes = input.body.len(), "Extracting");

        match input.doc_type {
            DocType::Html => self.extract_html(input).await,
            DocType::Pdf => self.extract_pdf(input.body, input.canonical_key).await,
            DocType::Txt => ExtractionOutcome::Text(input.text.to_string()),
            DocType::Json => self.supplemental_text(input.url).await,
            DocType::Rtf
            | DocType::Epub
            | DocType::Doc
            | DocType::Docx
            | DocType::Pptx
            | DocType::Ps
            | DocType::Xls
            | DocType::Xlsx
            | DocType::Image(_)
            | DocType::Audio(_) => ExtractionOutcome::Placeholder(
                input
                    .doc_type
                    .not_implemented_notice()
                    .unwrap_or_default()
                    .to_string(),
            ),
            DocType::Unsupported(value) => {
                ExtractionOutcome::Placeholder(format!("error: no doc_type: {value}"))
            }
        }
    }

    /// Page text followed by any provider transcript, separated by a blank
    /// line.
    async fn extract_html(&self, input: ExtractionInput<'_>) -> ExtractionOutcome {
        let body_text = extract_html_text(input.text);

        let supplemental = match self.supplemental_text(input.url).await {
            ExtractionOutcome::Unavailable { error, .. } => {
                warn!(url = %input.url, error = %error, "Transcript unavailable, using page text only");
                String::new()
            }
            outcome => outcome.into_text(),
        };

        let text = format!("{body_text}\n\n{supplemental}").trim().to_string();
        self.archive_text(&text_path(&DocType::Html, input.canonical_key), &text)
            .await;
        ExtractionOutcome::Text(text)
    }

    /// Write a text artifact when archival is enabled. Failures are logged.
    pub(crate) async fn archive_text(&self, key: &str, text: &str) {
        let Some(archive) = &self.archive else {
            return;
        };
        if let Err(e) = archive.write(key, text.as_bytes(), "text/plain").await {
            warn!(key = %key, error = %e, "Failed to archive text artifact");
        }
    }
}

impl std::fmt::Debug for ExtractionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionEngine")
            .field("capabilities", &self.capabilities)
            .field("archive", &self.archive.is_some())
            .field("ocr_page_timeout", &self.ocr_page_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::doc_type::{classify, AudioFormat, ImageFormat};

    fn input<'a>(doc_type: &'a DocType, text: &'a str) -> ExtractionInput<'a> {
        ExtractionInput {
            doc_type,
            body: text.as_bytes(),
            text,
            url: "https://example.com/a",
            canonical_key: "example.com/a",
        }
    }

    #[tokio::test]
    async fn test_html_strategy() {
        let engine = ExtractionEngine::new(Capabilities::none());
        let html = "<html><head><title>t</title></head><body>  Hello   World  </body></html>";
        let outcome = engine.extract(input(&DocType::Html, html)).await;
        assert_eq!(outcome.text(), "Hello World");
        assert!(!outcome.is_placeholder());
    }

    #[tokio::test]
    async fn test_txt_passthrough() {
        let engine = ExtractionEngine::new(Capabilities::none());
        let outcome = engine.extract(input(&DocType::Txt, "  raw\ttext  ")).await;
        assert_eq!(outcome.text(), "  raw\ttext  ");
    }

    #[tokio::test]
    async fn test_json_without_provider_is_empty() {
        let engine = ExtractionEngine::new(Capabilities::none());
        let outcome = engine.extract(input(&DocType::Json, "{\"a\":1}")).await;
        assert_eq!(outcome.text(), "");
    }

    #[tokio::test]
    async fn test_placeholders_are_type_specific() {
        let engine = ExtractionEngine::new(Capabilities::none());
        for doc_type in [
            DocType::Rtf,
            DocType::Docx,
            DocType::Image(ImageFormat::Png),
            DocType::Audio(AudioFormat::Mp3),
        ] {
            let outcome = engine.extract(input(&doc_type, "")).await;
            assert!(outcome.is_placeholder());
            assert!(outcome.text().contains("not yet implemented"), "{doc_type}");
        }

        let png = engine
            .extract(input(&DocType::Image(ImageFormat::Png), ""))
            .await;
        assert!(png.text().starts_with("PNG"));
    }

    #[tokio::test]
    async fn test_unsupported_reports_value() {
        let engine = ExtractionEngine::new(Capabilities::none());
        let doc_type = classify("application/x-custom");
        let outcome = engine.extract(input(&doc_type, "")).await;
        assert_eq!(outcome.text(), "error: no doc_type: application/x-custom");
        assert!(outcome.is_cacheable());
    }

    #[tokio::test]
    async fn test_pdf_without_capability_is_unavailable() {
        let engine = ExtractionEngine::new(Capabilities::none());
        let outcome = engine.extract(input(&DocType::Pdf, "%PDF-1.4")).await;
        assert_eq!(outcome.text(), pdf::DIGITAL_PDF_UNAVAILABLE);
        assert!(!outcome.is_cacheable());
        assert!(matches!(
            outcome.error(),
            Some(DocumentError::ExtractionUnavailable { .. })
        ));
    }
}
