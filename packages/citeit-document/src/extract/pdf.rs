//! PDF extraction: digital text first, OCR when that comes back empty.
//!
//! An empty digital result is not distinguished from a failed one; both
//! fall through to OCR.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::canonical::{ocr_page_path, text_path};
use crate::charset::repair_mojibake;
use crate::error::{DocumentError, Result};
use crate::extract::{ExtractionEngine, ExtractionOutcome};
use crate::traits::extractor::{OcrEngine, PdfTextExtractor};
use crate::types::doc_type::DocType;

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

pub const DIGITAL_PDF_UNAVAILABLE: &str =
    "Unable to process digital PDF. Pdftotext library not installed.";

pub const OCR_UNAVAILABLE: &str =
    "Unable to run OCR to generate PDF from scanned image.  Pdf2impage, Pytesseract not installed for Docker";

impl ExtractionEngine {
    /// Digital text of every page, or page-by-page OCR for scanned
    /// documents.
    pub(crate) async fn extract_pdf(&self, pdf: &[u8], canonical_key: &str) -> ExtractionOutcome {
        let Some(extractor) = &self.capabilities.pdf_text else {
            return ExtractionOutcome::missing("pdf_text", DIGITAL_PDF_UNAVAILABLE);
        };

        let digital = match extractor.page_texts(pdf).await {
            Ok(pages) => pages.join("\n\n").trim().to_string(),
            Err(e) => {
                warn!(key = %canonical_key, error = %e, "Digital PDF extraction failed, trying OCR");
                String::new()
            }
        };

        if !digital.is_empty() {
            self.archive_text(&text_path(&DocType::Pdf, canonical_key), &digital)
                .await;
            return ExtractionOutcome::Text(digital);
        }

        match &self.capabilities.ocr {
            Some(ocr) => self.ocr_pdf(ocr.as_ref(), pdf, canonical_key).await,
            None => ExtractionOutcome::missing("ocr", OCR_UNAVAILABLE),
        }
    }

    async fn ocr_pdf(&self, ocr: &dyn OcrEngine, pdf: &[u8], canonical_key: &str) -> ExtractionOutcome {
        let started = std::time::Instant::now();

        let page_count = match ocr.page_count(pdf).await {
            Ok(count) => count,
            Err(e) => {
                return ExtractionOutcome::Unavailable {
                    notice: OCR_UNAVAILABLE.to_string(),
                    error: e,
                }
            }
        };
        info!(key = %canonical_key, pages = page_count, engine = ocr.name(), "Running OCR");

        let mut pages = Vec::with_capacity(page_count);
        for page in 0..page_count {
            let text = match tokio::time::timeout(
                self.ocr_page_timeout,
                ocr.ocr_page(pdf, page, &self.ocr_language),
            )
            .await
            {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!(key = %canonical_key, page = page, error = %e, "OCR failed for page");
                    String::new()
                }
                Err(_) => {
                    warn!(
                        key = %canonical_key,
                        page = page,
                        budget_ms = self.ocr_page_timeout.as_millis() as u64,
                        "OCR page timed out"
                    );
                    String::new()
                }
            };

            self.archive_text(&ocr_page_path(canonical_key, page), &text)
                .await;
            pages.push(text);
        }

        let combined = repair_mojibake(pages.join("\n\n").trim());
        self.archive_text(&text_path(&DocType::Pdf, canonical_key), &combined)
            .await;

        info!(
            key = %canonical_key,
            pages = page_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OCR complete"
        );
        ExtractionOutcome::Text(combined)
    }
}

/// Digital PDF text via `lopdf`.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

#[cfg(feature = "pdf")]
#[async_trait]
impl PdfTextExtractor for LopdfExtractor {
    async fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>> {
        let bytes = pdf.to_vec();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let doc = lopdf::Document::load_mem(&bytes)
                .map_err(|e| DocumentError::extraction("lopdf", e))?;

            let pages = doc
                .get_pages()
                .keys()
                .map(|page_num| doc.extract_text(&[*page_num]).unwrap_or_default())
                .collect();
            Ok(pages)
        })
        .await
        .map_err(|e| DocumentError::extraction("lopdf", e))?
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

/// OCR through the poppler and tesseract command-line tools.
///
/// Each page is rendered with `pdftoppm` and recognized with `tesseract`;
/// `pdfinfo` supplies the page count.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    work_dir: PathBuf,
    resolution: u32,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            resolution: 300,
        }
    }

    /// Directory for intermediate PDF and image files.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Render resolution in DPI.
    pub fn with_resolution(mut self, dpi: u32) -> Self {
        self.resolution = dpi;
        self
    }

    /// Spill the PDF to a uniquely named file; removed on drop.
    async fn spill(&self, pdf: &[u8], tag: &str) -> Result<ScratchFile> {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = format!("citeit-ocr-{}-{}-{}.pdf", std::process::id(), n, tag);
        let path = self.work_dir.join(name);
        tokio::fs::write(&path, pdf)
            .await
            .map_err(|e| DocumentError::extraction("ocr", e))?;
        Ok(ScratchFile(path))
    }
}

/// Temporary file deleted when dropped.
struct ScratchFile(PathBuf);

impl ScratchFile {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Run a command-line tool, returning stdout on success.
pub(crate) async fn run_tool(program: &str, args: &[&str]) -> Result<Vec<u8>> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| DocumentError::ExtractionUnavailable {
            capability: format!("{program}: {e}"),
        })?;

    if !output.status.success() {
        return Err(DocumentError::extraction(
            program,
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }
    Ok(output.stdout)
}

/// Page count from `pdfinfo` output.
fn parse_page_count(pdfinfo: &str) -> Option<usize> {
    pdfinfo
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse().ok())
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn page_count(&self, pdf: &[u8]) -> Result<usize> {
        let file = self.spill(pdf, "info").await?;
        let path = file.path().to_string_lossy().into_owned();
        let stdout = run_tool("pdfinfo", &[&path]).await?;

        parse_page_count(&String::from_utf8_lossy(&stdout))
            .ok_or_else(|| DocumentError::extraction("pdfinfo", "no page count in output"))
    }

    async fn ocr_page(&self, pdf: &[u8], page: usize, language: &str) -> Result<String> {
        let file = self.spill(pdf, &format!("p{page}")).await?;
        let pdf_path = file.path().to_string_lossy().into_owned();
        let prefix = format!("{pdf_path}-page");
        let image = ScratchFile(PathBuf::from(format!("{prefix}.png")));

        let number = (page + 1).to_string();
        let resolution = self.resolution.to_string();
        run_tool(
            "pdftoppm",
            &[
                "-f", &number, "-l", &number, "-r", &resolution, "-png", "-singlefile", &pdf_path,
                &prefix,
            ],
        )
        .await?;

        let image_path = image.path().to_string_lossy().into_owned();
        let stdout = run_tool("tesseract", &[&image_path, "stdout", "-l", language]).await?;
        debug!(page = page, bytes = stdout.len(), "Recognized page");

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryArchive;
    use crate::testing::{MockOcr, MockPdfText};
    use crate::traits::extractor::Capabilities;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_digital_text_joined_by_blank_lines() {
        let caps = Capabilities::none().with_pdf_text(MockPdfText::new(vec!["Page one", "Page two"]));
        let engine = ExtractionEngine::new(caps);

        let outcome = engine.extract_pdf(b"%PDF-1.4", "x.org/a.pdf").await;
        assert_eq!(outcome.text(), "Page one\n\nPage two");
    }

    #[tokio::test]
    async fn test_empty_digital_text_falls_back_to_ocr() {
        let ocr = MockOcr::new(vec!["Scanned one", "Scanned two"]);
        let caps = Capabilities::none()
            .with_pdf_text(MockPdfText::new(vec!["", "  "]))
            .with_ocr(ocr.clone());
        let archive = Arc::new(MemoryArchive::new());
        let engine = ExtractionEngine::new(caps).with_archive(archive.clone());

        let outcome = engine.extract_pdf(b"%PDF-1.4", "x.org/a.pdf").await;
        assert_eq!(outcome.text(), "Scanned one\n\nScanned two");
        assert_eq!(ocr.pages_requested(), vec![0, 1]);

        assert_eq!(
            archive.keys(),
            vec![
                "pdf/x.org%2Fa.pdf.txt".to_string(),
                "pdf/x.org%2Fa.pdf.txt@@-page-0000.txt".to_string(),
                "pdf/x.org%2Fa.pdf.txt@@-page-0001.txt".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_ocr_missing() {
        let caps = Capabilities::none().with_pdf_text(MockPdfText::new(vec![""]));
        let engine = ExtractionEngine::new(caps);

        let outcome = engine.extract_pdf(b"%PDF-1.4", "x.org/a.pdf").await;
        assert_eq!(outcome.text(), OCR_UNAVAILABLE);
        assert!(!outcome.is_cacheable());
    }

    #[tokio::test]
    async fn test_slow_page_is_bounded() {
        let ocr = MockOcr::new(vec!["fast", "slow", "fast again"])
            .with_page_delay(1, Duration::from_secs(5));
        let caps = Capabilities::none()
            .with_pdf_text(MockPdfText::new(vec![""]))
            .with_ocr(ocr);
        let config = crate::types::config::ResolverConfig::default()
            .with_ocr_page_timeout(Duration::from_millis(50));
        let engine = ExtractionEngine::new(caps).with_config(&config);

        let outcome = engine.extract_pdf(b"%PDF-1.4", "x.org/a.pdf").await;
        assert_eq!(outcome.text(), "fast\n\n\n\nfast again");
    }

    #[test]
    fn test_parse_page_count() {
        let out = "Title:          x\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_page_count(out), Some(12));
        assert_eq!(parse_page_count("garbage"), None);
    }
}
