//! Configuration types for fetching, caching and extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like user agent so servers return what a reader would see.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:71.0) Gecko/20100101 Firefox/71.0";

/// Retry policy for transient connection failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Default: 5.
    pub max_retries: u32,

    /// Base delay; the n-th retry sleeps `backoff_factor * 2^(n-1)`.
    ///
    /// Default: 500ms.
    #[serde(with = "duration_millis")]
    pub backoff_factor: Duration,

    /// Upper bound for any single backoff sleep. Default: 30s.
    #[serde(with = "duration_millis")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Sleep before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.backoff_factor
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Configuration for the resolution pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// User agent sent with every request.
    pub user_agent: String,

    /// Per-request timeout. Default: 30s.
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,

    /// Retry policy for connection failures.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Charset labels that override what the server declares.
    ///
    /// Keys are protocol-stripped URLs or bare hosts.
    #[serde(default)]
    pub encoding_overrides: HashMap<String, String>,

    /// Archive original payloads and text artifacts. Default: false.
    pub save_downloads: bool,

    /// Root folder for archived payloads. Default: `../downloads/`.
    pub downloads_root: PathBuf,

    /// Simultaneous resolutions in `resolve_many`. Default: 5.
    pub max_concurrent_downloads: usize,

    /// Entries held by the in-memory caches. Default: 500.
    pub cache_capacity: usize,

    /// Time budget for OCR of a single PDF page. Default: 60s.
    #[serde(with = "duration_millis")]
    pub ocr_page_timeout: Duration,

    /// Tesseract language code for OCR. Default: `eng`.
    pub ocr_language: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            encoding_overrides: HashMap::new(),
            save_downloads: false,
            downloads_root: PathBuf::from("../downloads/"),
            max_concurrent_downloads: 5,
            cache_capacity: 500,
            ocr_page_timeout: Duration::from_secs(60),
            ocr_language: "eng".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Force a charset for a URL (protocol-stripped) or host.
    pub fn with_encoding_override(
        mut self,
        url_or_host: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.encoding_overrides
            .insert(url_or_host.into(), label.into());
        self
    }

    /// Enable or disable archival of downloads.
    pub fn with_save_downloads(mut self, save: bool) -> Self {
        self.save_downloads = save;
        self
    }

    /// Set the archive root folder.
    pub fn with_downloads_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.downloads_root = root.into();
        self
    }

    /// Set the worker pool size for `resolve_many`.
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }

    /// Set the in-memory cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the per-page OCR budget.
    pub fn with_ocr_page_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_page_timeout = timeout;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::ZERO);
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
        assert_eq!(policy.backoff(20), Duration::from_secs(30));
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 6);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = ResolverConfig::new()
            .with_save_downloads(true)
            .with_encoding_override("example.com", "windows-1252");
        let json = serde_json::to_string(&config).unwrap();
        let back: ResolverConfig = serde_json::from_str(&json).unwrap();
        assert!(back.save_downloads);
        assert_eq!(back.encoding_overrides["example.com"], "windows-1252");
        assert_eq!(back.retry.backoff_factor, Duration::from_millis(500));
    }

    #[test]
    fn test_concurrency_floor() {
        let config = ResolverConfig::new().with_max_concurrent_downloads(0);
        assert_eq!(config.max_concurrent_downloads, 1);
    }
}
