//! Testing utilities including mock implementations.
//!
//! These let applications exercise document resolution without network
//! access or external OCR and caption tools.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{DocumentError, Result};
use crate::traits::extractor::{OcrEngine, PdfTextExtractor, SubtitleSource, TranscriptSource};

pub use crate::fetchers::MockFetcher;

/// Digital PDF extractor returning fixed page texts for any input.
#[derive(Debug, Clone, Default)]
pub struct MockPdfText {
    pages: Vec<String>,
    fail: bool,
}

impl MockPdfText {
    pub fn new(pages: Vec<&str>) -> Self {
        Self {
            pages: pages.into_iter().map(String::from).collect(),
            fail: false,
        }
    }

    /// Every call fails, as with a corrupt file.
    pub fn failing() -> Self {
        Self {
            pages: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PdfTextExtractor for MockPdfText {
    async fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>> {
        if self.fail {
            return Err(DocumentError::extraction("mock-pdf", "corrupt document"));
        }
        Ok(self.pages.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// OCR engine with one canned text per page.
///
/// Clones share call tracking, so a test can keep a handle after moving
/// the engine into [`Capabilities`](crate::traits::extractor::Capabilities).
#[derive(Debug, Clone, Default)]
pub struct MockOcr {
    pages: Arc<Vec<String>>,
    /// Simulated recognition time per page
    delays: Arc<RwLock<HashMap<usize, Duration>>>,
    /// Pages requested, in order
    requested: Arc<RwLock<Vec<usize>>>,
}

impl MockOcr {
    pub fn new(pages: Vec<&str>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().map(String::from).collect()),
            ..Default::default()
        }
    }

    /// Make recognition of `page` take `delay`.
    pub fn with_page_delay(self, page: usize, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(page, delay);
        self
    }

    pub fn pages_requested(&self) -> Vec<usize> {
        self.requested.read().unwrap().clone()
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    async fn page_count(&self, _pdf: &[u8]) -> Result<usize> {
        Ok(self.pages.len())
    }

    async fn ocr_page(&self, _pdf: &[u8], page: usize, _language: &str) -> Result<String> {
        self.requested.write().unwrap().push(page);

        let delay = self.delays.read().unwrap().get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.pages
            .get(page)
            .cloned()
            .ok_or_else(|| DocumentError::extraction("mock-ocr", format!("no page {page}")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Caption source backed by a map of video id to WebVTT.
#[derive(Debug, Clone, Default)]
pub struct MockSubtitles {
    captions: Arc<RwLock<HashMap<String, String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockSubtitles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_captions(self, video_id: impl Into<String>, vtt: impl Into<String>) -> Self {
        self.captions
            .write()
            .unwrap()
            .insert(video_id.into(), vtt.into());
        self
    }

    /// Number of caption requests made.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl SubtitleSource for MockSubtitles {
    async fn english_captions(&self, video_id: &str) -> Result<Option<String>> {
        self.calls.write().unwrap().push(video_id.to_string());
        Ok(self.captions.read().unwrap().get(video_id).cloned())
    }
}

/// Transcript source backed by a map of case id to JSON.
#[derive(Debug, Clone, Default)]
pub struct MockTranscripts {
    transcripts: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(self, case_id: impl Into<String>, json: serde_json::Value) -> Self {
        self.transcripts
            .write()
            .unwrap()
            .insert(case_id.into(), json);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl TranscriptSource for MockTranscripts {
    async fn transcript_json(&self, case_id: &str) -> Result<Option<serde_json::Value>> {
        self.calls.write().unwrap().push(case_id.to_string());
        Ok(self.transcripts.read().unwrap().get(case_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_ocr_shares_tracking() {
        let ocr = MockOcr::new(vec!["one", "two"]);
        let handle = ocr.clone();

        assert_eq!(ocr.page_count(b"").await.unwrap(), 2);
        assert_eq!(ocr.ocr_page(b"", 1, "eng").await.unwrap(), "two");
        assert!(ocr.ocr_page(b"", 5, "eng").await.is_err());
        assert_eq!(handle.pages_requested(), vec![1, 5]);
    }

    #[tokio::test]
    async fn test_mock_pdf_failing() {
        assert!(MockPdfText::failing().page_texts(b"").await.is_err());
        assert_eq!(
            MockPdfText::new(vec!["a"]).page_texts(b"").await.unwrap(),
            vec!["a".to_string()]
        );
    }
}
