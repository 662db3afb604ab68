//! Document type classification from negotiated content types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Raster image formats that may be OCR'd some day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpg,
    Png,
    Tiff,
    Gif,
    Webp,
}

/// Audio formats that would need speech recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Ogg,
    /// Ogg container served as `video/ogg`
    OggVideo,
    Wav,
    Aac,
}

/// Coarse document classification driving the extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocType {
    Html,
    Pdf,
    Txt,
    Json,
    Rtf,
    Epub,
    Doc,
    Docx,
    Pptx,
    Ps,
    Xls,
    Xlsx,
    Image(ImageFormat),
    Audio(AudioFormat),
    /// Content type with no known mapping; holds the raw value
    Unsupported(String),
}

/// MIME substrings checked in order. `pdf` must precede `html` and the
/// office formats must precede their generic parents.
const MIME_TABLE: &[(&str, DocType)] = &[
    ("pdf", DocType::Pdf),
    ("html", DocType::Html),
    ("json", DocType::Json),
    ("rtf", DocType::Rtf),
    ("epub", DocType::Epub),
    ("wordprocessingml", DocType::Docx),
    ("msword", DocType::Doc),
    ("presentationml", DocType::Pptx),
    ("spreadsheetml", DocType::Xlsx),
    ("ms-excel", DocType::Xls),
    ("postscript", DocType::Ps),
    ("image/jpeg", DocType::Image(ImageFormat::Jpg)),
    ("image/jpg", DocType::Image(ImageFormat::Jpg)),
    ("image/png", DocType::Image(ImageFormat::Png)),
    ("image/tiff", DocType::Image(ImageFormat::Tiff)),
    ("image/gif", DocType::Image(ImageFormat::Gif)),
    ("image/webp", DocType::Image(ImageFormat::Webp)),
    ("audio/mpeg", DocType::Audio(AudioFormat::Mp3)),
    ("audio/mp3", DocType::Audio(AudioFormat::Mp3)),
    ("audio/ogg", DocType::Audio(AudioFormat::Ogg)),
    ("video/ogg", DocType::Audio(AudioFormat::OggVideo)),
    ("wav", DocType::Audio(AudioFormat::Wav)),
    ("audio/aac", DocType::Audio(AudioFormat::Aac)),
    ("text/", DocType::Txt),
];

/// Map a content-type header value to a document type.
///
/// Missing or blank content types are treated as HTML: servers that omit
/// the header are overwhelmingly serving web pages.
pub fn classify(content_type: &str) -> DocType {
    let mime = content_type.trim().to_ascii_lowercase();
    if mime.is_empty() {
        return DocType::Html;
    }

    MIME_TABLE
        .iter()
        .find(|(needle, _)| mime.contains(needle))
        .map(|(_, doc_type)| doc_type.clone())
        .unwrap_or_else(|| DocType::Unsupported(essence(&mime).to_string()))
}

/// The MIME type without parameters (`text/x; charset=y` -> `text/x`).
fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

impl DocType {
    /// Stable short tag, also used as the archive sub-folder.
    pub fn tag(&self) -> &str {
        match self {
            DocType::Html => "html",
            DocType::Pdf => "pdf",
            DocType::Txt => "txt",
            DocType::Json => "json",
            DocType::Rtf => "rtf",
            DocType::Epub => "epub",
            DocType::Doc => "doc",
            DocType::Docx => "docx",
            DocType::Pptx => "pptx",
            DocType::Ps => "ps",
            DocType::Xls => "xls",
            DocType::Xlsx => "xlsx",
            DocType::Image(ImageFormat::Jpg) => "jpg",
            DocType::Image(ImageFormat::Png) => "png",
            DocType::Image(ImageFormat::Tiff) => "tiff",
            DocType::Image(ImageFormat::Gif) => "gif",
            DocType::Image(ImageFormat::Webp) => "webp",
            DocType::Audio(AudioFormat::Mp3) => "mp3",
            DocType::Audio(AudioFormat::Ogg) => "ogg",
            DocType::Audio(AudioFormat::OggVideo) => "ogv",
            DocType::Audio(AudioFormat::Wav) => "wav",
            DocType::Audio(AudioFormat::Aac) => "aac",
            DocType::Unsupported(raw) => raw,
        }
    }

    /// Whether the payload is character data (archived and exposed as text).
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            DocType::Html | DocType::Txt | DocType::Json | DocType::Rtf
        )
    }

    /// Diagnostic returned for recognized types without an extractor.
    pub fn not_implemented_notice(&self) -> Option<&'static str> {
        let notice = match self {
            DocType::Rtf => "RTF support not yet implemented. To implement it see: http://www.gnu.org/software/unrtf/",
            DocType::Epub => "EPub support not yet implemented. To implement it see: https://github.com/aerkalov/ebooklib",
            DocType::Doc => "Doc support not yet implemented. To implement it see: http://www.winfield.demon.nl/",
            DocType::Docx => "Docx support not yet implemented.",
            DocType::Pptx => "Powerpoint support not yet implemented.",
            DocType::Ps => "PostScript support not yet implemented. To implement it see: http://www.winfield.demon.nl/",
            DocType::Xls => "XLS support not yet implemented.",
            DocType::Xlsx => "XLSX support not yet implemented.",
            DocType::Audio(AudioFormat::Mp3) => "MP3 support not yet implemented. Audio needs a speech-to-text backend.",
            DocType::Audio(AudioFormat::Ogg) | DocType::Audio(AudioFormat::OggVideo) => {
                "OGG support not yet implemented. Audio needs a speech-to-text backend."
            }
            DocType::Audio(AudioFormat::Wav) => "WAV support not yet implemented. Audio needs a speech-to-text backend.",
            DocType::Audio(AudioFormat::Aac) => "AAC support not yet implemented. Audio needs a speech-to-text backend.",
            DocType::Image(ImageFormat::Jpg) => "JPG support not yet implemented. To implement it see: https://github.com/tesseract-ocr/",
            DocType::Image(ImageFormat::Png) => "PNG support not yet implemented. To implement it see: https://github.com/tesseract-ocr/",
            DocType::Image(ImageFormat::Tiff) => "TIFF support not yet implemented. To implement it see: https://github.com/tesseract-ocr/",
            DocType::Image(ImageFormat::Gif) => "GIF support not yet implemented. To implement it see: https://github.com/tesseract-ocr/",
            DocType::Image(ImageFormat::Webp) => "WebP support not yet implemented. To implement it see: https://github.com/tesseract-ocr/",
            DocType::Html
            | DocType::Pdf
            | DocType::Txt
            | DocType::Json
            | DocType::Unsupported(_) => return None,
        };
        Some(notice)
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DocType {
    type Err = std::convert::Infallible;

    /// Parse a tag produced by [`DocType::tag`]. Unknown tags become
    /// `Unsupported`, so this never fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let doc_type = match s {
            "html" => DocType::Html,
            "pdf" => DocType::Pdf,
            "txt" => DocType::Txt,
            "json" => DocType::Json,
            "rtf" => DocType::Rtf,
            "epub" => DocType::Epub,
            "doc" => DocType::Doc,
            "docx" => DocType::Docx,
            "pptx" => DocType::Pptx,
            "ps" => DocType::Ps,
            "xls" => DocType::Xls,
            "xlsx" => DocType::Xlsx,
            "jpg" => DocType::Image(ImageFormat::Jpg),
            "png" => DocType::Image(ImageFormat::Png),
            "tiff" => DocType::Image(ImageFormat::Tiff),
            "gif" => DocType::Image(ImageFormat::Gif),
            "webp" => DocType::Image(ImageFormat::Webp),
            "mp3" => DocType::Audio(AudioFormat::Mp3),
            "ogg" => DocType::Audio(AudioFormat::Ogg),
            "ogv" => DocType::Audio(AudioFormat::OggVideo),
            "wav" => DocType::Audio(AudioFormat::Wav),
            "aac" => DocType::Audio(AudioFormat::Aac),
            other => DocType::Unsupported(other.to_string()),
        };
        Ok(doc_type)
    }
}

impl Serialize for DocType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for DocType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(tag.parse().unwrap_or(DocType::Unsupported(tag)))
    }
}
