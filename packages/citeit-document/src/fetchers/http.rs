//! HTTP fetcher implementation.
//!
//! Fetches a single URL with reqwest, retrying connect and timeout failures
//! with exponential backoff, and resolves the content type and charset of
//! the body.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;

use crate::charset;
use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::Fetcher;
use crate::types::config::{ResolverConfig, RetryPolicy};
use crate::types::resource::FetchedResource;

/// Content type assumed when a server sends none.
pub const FALLBACK_CONTENT_TYPE: &str = "text/html";

/// HTTP fetcher backed by reqwest.
///
/// # Example
///
/// ```rust,ignore
/// use citeit_document::fetchers::HttpFetcher;
///
/// let fetcher = HttpFetcher::from_config(&ResolverConfig::default());
/// let resource = fetcher.fetch("https://example.com/a").await?;
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    retry: RetryPolicy,
    encoding_overrides: HashMap<String, String>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a new HTTP fetcher with default settings.
    pub fn new() -> Self {
        Self::from_config(&ResolverConfig::default())
    }

    /// Create a fetcher from resolver configuration.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: config.user_agent.clone(),
            retry: config.retry.clone(),
            encoding_overrides: config.encoding_overrides.clone(),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Force a charset for a URL or host.
    pub fn with_encoding_override(
        mut self,
        url_or_host: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.encoding_overrides
            .insert(url_or_host.into(), label.into());
        self
    }

    /// Send a GET, retrying transient failures per the retry policy.
    async fn send_with_retry(&self, url: &Url) -> FetchResult<(reqwest::Response, u32)> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = self
                .client
                .get(url.clone())
                .header(reqwest::header::USER_AGENT, &self.user_agent)
                .send()
                .await;

            match result {
                Ok(response) => return Ok((response, attempt)),
                Err(e) if is_transient(&e) && attempt < self.retry.max_attempts() => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        url = %url,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(url = %url, attempts = attempt, error = %e, "HTTP request failed");
                    return Err(FetchError::Connection {
                        url: url.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}

/// Connect and timeout errors are worth another attempt; anything else is
/// final.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Content type for a response, falling back on magic bytes and then on
/// `text/html` when the header is missing.
pub fn content_type_or_fallback(header: Option<&str>, body: &[u8]) -> (String, bool) {
    match header.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(ct) => (ct.to_string(), false),
        None if body.starts_with(b"%PDF-") => ("application/pdf".to_string(), true),
        None => (FALLBACK_CONTENT_TYPE.to_string(), true),
    }
}

/// Parse and check a URL before any request is sent.
fn parse_fetchable(url: &str) -> FetchResult<Url> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(parsed)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedResource> {
        let parsed = parse_fetchable(url)?;
        debug!(url = %url, "HTTP fetch starting");

        let (response, attempts) = self.send_with_retry(&parsed).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Non-success status, processing body anyway");
        }

        let final_url = response.url().to_string();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body {
                url: url.to_string(),
                source: Box::new(e),
            })?
            .to_vec();

        let (content_type, fell_back) =
            content_type_or_fallback(headers.get("content-type").map(String::as_str), &body);
        if fell_back {
            warn!(url = %url, assumed = %content_type, "Response has no content-type");
        }

        let host = parsed.host_str().unwrap_or("");
        let encoding =
            charset::resolve_encoding(&self.encoding_overrides, url, host, &content_type, &body);

        info!(
            url = %url,
            status = status.as_u16(),
            attempts = attempts,
            bytes = body.len(),
            content_type = %content_type,
            encoding = %encoding,
            "Downloaded"
        );

        Ok(FetchedResource {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            headers,
            body,
            content_type,
            encoding,
            fetched_at: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::DEFAULT_USER_AGENT;
    use std::time::Duration;

    #[test]
    fn test_content_type_fallback() {
        assert_eq!(
            content_type_or_fallback(Some("text/plain"), b"x"),
            ("text/plain".to_string(), false)
        );
        assert_eq!(
            content_type_or_fallback(None, b"<html>"),
            ("text/html".to_string(), true)
        );
        assert_eq!(
            content_type_or_fallback(Some("  "), b"%PDF-1.4\n"),
            ("application/pdf".to_string(), true)
        );
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = HttpFetcher::new();
        let err = fetcher.fetch("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));

        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_exhausts_retries() {
        let retry = RetryPolicy {
            max_retries: 2,
            backoff_factor: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        };
        let fetcher = HttpFetcher::new().with_retry(retry);

        let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();
        match err {
            FetchError::Connection { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_user_agent_is_browser_like() {
        let fetcher = HttpFetcher::new();
        assert_eq!(fetcher.user_agent, DEFAULT_USER_AGENT);
    }
}
