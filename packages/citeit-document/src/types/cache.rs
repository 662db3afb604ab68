//! Cached text records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Metadata keys written alongside cached document text.
pub mod keys {
    pub const CANONICAL_URL: &str = "canonical_url";
    pub const CITEIT_URL: &str = "citeit_url";
    pub const CONTENT_TYPE: &str = "content_type";
    pub const DOC_TYPE: &str = "doc_type";
    pub const ENCODING: &str = "encoding";
    pub const LANGUAGE: &str = "language";
    pub const PLACEHOLDER: &str = "placeholder";
    pub const REQUEST_STOP: &str = "request_stop";
    pub const PROVIDER: &str = "provider";
}

/// A cached text record.
///
/// Documents are keyed by their protocol-stripped URL; provider
/// transcripts by `<provider>:<native id>`. The content hash lets callers
/// notice when a refreshed source produced different text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key
    pub key: String,

    /// Extracted text
    pub text: String,

    /// Decoded source text, when the source was textual
    #[serde(default)]
    pub raw: Option<String>,

    /// Document metadata, see [`keys`]
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// SHA-256 hash of `text`
    pub content_hash: String,

    /// When the entry was written
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create a new entry.
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let content_hash = Self::hash_content(&text);

        Self {
            key: key.into(),
            text,
            raw: None,
            metadata: HashMap::new(),
            content_hash,
            stored_at: Utc::now(),
        }
    }

    /// Calculate SHA-256 hash of content.
    pub fn hash_content(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Attach the decoded source text.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Add a metadata key-value pair.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Copy of this entry under another key.
    pub fn rekeyed(&self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..self.clone()
        }
    }

    /// Metadata value, empty when absent.
    pub fn meta(&self, key: &str) -> &str {
        self.metadata.get(key).map(String::as_str).unwrap_or("")
    }

    /// Check if content has changed by comparing hashes.
    pub fn content_changed(&self, new_content: &str) -> bool {
        Self::hash_content(new_content) != self.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        let entry = CacheEntry::new("example.com/a", "Hello World");
        assert_eq!(entry.content_hash.len(), 64);
        assert!(!entry.content_changed("Hello World"));
        assert!(entry.content_changed("Hello, World"));
    }

    #[test]
    fn test_rekeyed_keeps_payload() {
        let entry = CacheEntry::new("a", "text")
            .with_raw("<p>text</p>")
            .with_metadata(keys::DOC_TYPE, "html");
        let copy = entry.rekeyed("b");
        assert_eq!(copy.key, "b");
        assert_eq!(copy.text, entry.text);
        assert_eq!(copy.meta(keys::DOC_TYPE), "html");
        assert_eq!(copy.meta(keys::LANGUAGE), "");
    }
}
