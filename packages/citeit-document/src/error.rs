//! Typed errors for document resolution.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Fetch errors become a
//! terminal state on the document; extraction problems become placeholder
//! text. Callers of the document accessors never see these propagate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while resolving a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Input lacks a scheme or authority, or cannot be parsed
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network retrieval failed after exhausting the retry policy
    #[error("connection error fetching {url} after {attempts} attempt(s): {message}")]
    Connection {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Cache or archive collaborator failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An optional extraction capability is not configured
    #[error("extraction unavailable: {capability}")]
    ExtractionUnavailable { capability: String },

    /// A configured extraction capability ran and failed
    #[error("{capability} failed: {message}")]
    Extraction { capability: String, message: String },

    /// Text could not be decoded with the resolved charset
    #[error("encoding error: {label}")]
    Encoding { label: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocumentError {
    /// The serializable tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            DocumentError::Connection { .. } => ErrorKind::ConnectionError,
            DocumentError::Storage(_) => ErrorKind::StorageError,
            DocumentError::ExtractionUnavailable { .. } | DocumentError::Extraction { .. } => {
                ErrorKind::ExtractionUnavailable
            }
            DocumentError::Encoding { .. } => ErrorKind::EncodingError,
            DocumentError::Json(_) => ErrorKind::StorageError,
        }
    }

    /// A capability failure with a displayable cause.
    pub fn extraction(capability: impl Into<String>, err: impl std::fmt::Display) -> Self {
        DocumentError::Extraction {
            capability: capability.into(),
            message: err.to_string(),
        }
    }

    /// Wrap any storage backend error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DocumentError::Storage(Box::new(err))
    }
}

impl From<FetchError> for DocumentError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl { url, reason } => DocumentError::InvalidUrl { url, reason },
            FetchError::Connection {
                url,
                attempts,
                source,
            } => DocumentError::Connection {
                url,
                attempts,
                message: source.to_string(),
            },
            FetchError::Body { url, source } => DocumentError::Connection {
                url,
                attempts: 1,
                message: source.to_string(),
            },
        }
    }
}

/// Errors raised by a [`Fetcher`](crate::traits::fetcher::Fetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL rejected before any request was sent
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport failure that survived all retries
    #[error("connection failed for {url} after {attempts} attempt(s): {source}")]
    Connection {
        url: String,
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Response arrived but its body could not be read
    #[error("failed reading body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Error category recorded on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    ConnectionError,
    ExtractionUnavailable,
    EncodingError,
    StorageError,
}

/// The most recent error seen by a document, exposed in its data view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&DocumentError> for LastError {
    fn from(err: &DocumentError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_maps_to_connection() {
        let err = FetchError::Connection {
            url: "https://example.com".into(),
            attempts: 6,
            source: "refused".into(),
        };
        let doc_err: DocumentError = err.into();
        assert_eq!(doc_err.kind(), ErrorKind::ConnectionError);
        assert!(doc_err.to_string().contains("6 attempt"));
    }

    #[test]
    fn test_last_error_serializes_kind_as_snake_case() {
        let err = DocumentError::InvalidUrl {
            url: "ftp:/bad".into(),
            reason: "missing authority".into(),
        };
        let last = LastError::from(&err);
        let json = serde_json::to_value(&last).unwrap();
        assert_eq!(json["kind"], "invalid_url");
    }
}
