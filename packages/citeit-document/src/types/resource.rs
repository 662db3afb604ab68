//! The superset result of a network fetch.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Everything a fetch produced: status, headers, body and the negotiated
/// content type and charset.
///
/// Classification and decoding run purely over this value, so there is
/// never a second request to "peek" at a body.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// URL that was requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers, lowercased names
    pub headers: HashMap<String, String>,

    /// Raw response body
    pub body: Vec<u8>,

    /// Content type from headers, or the fallback chosen by the fetcher
    pub content_type: String,

    /// Charset label resolved for the body
    pub encoding: String,

    /// When the response completed
    pub fetched_at: DateTime<Utc>,
}

impl FetchedResource {
    /// Create a 200 response with an explicit content type.
    pub fn new(url: impl Into<String>, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            headers: HashMap::new(),
            body: body.into(),
            content_type: content_type.into(),
            encoding: "utf-8".to_string(),
            fetched_at: Utc::now(),
        }
    }

    /// Set the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set the resolved charset label.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the final URL after redirects.
    pub fn with_final_url(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = final_url.into();
        self
    }

    /// Add a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body length in bytes.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}
