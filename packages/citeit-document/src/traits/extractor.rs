//! Optional extraction capabilities.
//!
//! Each capability is injected into the extraction engine. A missing one is
//! a configuration fact: the engine reports `ExtractionUnavailable` with a
//! diagnostic string instead of failing at runtime.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Digital text extraction from PDF bytes.
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    /// Text of each page, in page order. Scanned pages yield empty strings.
    async fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>>;

    fn name(&self) -> &str {
        "pdf-text"
    }
}

/// Optical character recognition over rendered PDF pages.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Number of pages in the document.
    async fn page_count(&self, pdf: &[u8]) -> Result<usize>;

    /// Recognize a single page, numbered from zero.
    async fn ocr_page(&self, pdf: &[u8], page: usize, language: &str) -> Result<String>;

    fn name(&self) -> &str {
        "ocr"
    }
}

/// English captions for a hosted video.
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Raw WebVTT captions, or `None` when the video has no English track.
    async fn english_captions(&self, video_id: &str) -> Result<Option<String>>;
}

/// Structured court transcripts.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Transcript document for a case id, or `None` when there is none.
    async fn transcript_json(&self, case_id: &str) -> Result<Option<serde_json::Value>>;
}

/// The capabilities available to an extraction engine.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub pdf_text: Option<Arc<dyn PdfTextExtractor>>,
    pub ocr: Option<Arc<dyn OcrEngine>>,
    pub subtitles: Option<Arc<dyn SubtitleSource>>,
    pub transcripts: Option<Arc<dyn TranscriptSource>>,
}

impl Capabilities {
    /// No capabilities at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_pdf_text(mut self, extractor: impl PdfTextExtractor + 'static) -> Self {
        self.pdf_text = Some(Arc::new(extractor));
        self
    }

    pub fn with_ocr(mut self, engine: impl OcrEngine + 'static) -> Self {
        self.ocr = Some(Arc::new(engine));
        self
    }

    pub fn with_subtitles(mut self, source: impl SubtitleSource + 'static) -> Self {
        self.subtitles = Some(Arc::new(source));
        self
    }

    pub fn with_transcripts(mut self, source: impl TranscriptSource + 'static) -> Self {
        self.transcripts = Some(Arc::new(source));
        self
    }

    /// Names of the configured capabilities, for startup logging.
    pub fn describe(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.pdf_text.is_some() {
            names.push("pdf_text");
        }
        if self.ocr.is_some() {
            names.push("ocr");
        }
        if self.subtitles.is_some() {
            names.push("subtitles");
        }
        if self.transcripts.is_some() {
            names.push("transcripts");
        }
        names
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}
