//! The data contract returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LastError;
use crate::types::doc_type::DocType;

/// Options for [`Resolver::resolve`](crate::pipeline::Resolver::resolve).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Include diagnostic fields such as `num_downloads`.
    pub verbose: bool,
}

impl ResolveOptions {
    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

/// Stable read-only view of a resolved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    /// URL as supplied
    pub url: String,

    /// Canonical URL without protocol (empty when unresolvable)
    pub canonical_url: String,

    /// Identity used for citation lookup
    pub citeit_url: String,

    pub doc_type: DocType,

    pub content_type: String,

    /// ISO 639-1 code, empty when unknown
    pub language: String,

    /// Resolved charset label, lowercase
    pub encoding: String,

    /// Extracted, normalized text. Never absent.
    pub text: String,

    /// Decoded source text (empty for binary sources)
    pub raw: String,

    pub request_start: DateTime<Utc>,

    pub request_stop: Option<DateTime<Utc>>,

    /// Seconds between `request_start` and `request_stop`
    pub elapsed_time: f64,

    /// Network fetches performed by this document (verbose only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_downloads: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LastError>,
}

/// Lifecycle of a document record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    New,
    Classifying,
    Fetching,
    /// Fetch finished; `ok` is false for a terminal error
    Fetched { ok: bool },
    Extracting,
    /// Text assigned; `placeholder` marks diagnostic text
    Resolved { placeholder: bool },
}

impl DocumentState {
    /// Whether the fetch stage is behind us.
    pub fn is_fetched(&self) -> bool {
        !matches!(
            self,
            DocumentState::New | DocumentState::Classifying | DocumentState::Fetching
        )
    }
}
