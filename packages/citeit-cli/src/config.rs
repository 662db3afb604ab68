use anyhow::{Context, Result};
use citeit_document::ResolverConfig;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub resolver: ResolverConfig,
    /// SQLite URL for a persistent document cache
    pub database_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let mut resolver = ResolverConfig::default();

        if let Ok(user_agent) = env::var("CITEIT_USER_AGENT") {
            resolver = resolver.with_user_agent(user_agent);
        }
        if let Some(save) = parse_var::<bool>("CITEIT_SAVE_DOWNLOADS")? {
            resolver = resolver.with_save_downloads(save);
        }
        if let Ok(root) = env::var("CITEIT_DOWNLOADS_ROOT") {
            resolver = resolver.with_downloads_root(root);
        }
        if let Some(max) = parse_var::<usize>("CITEIT_MAX_CONCURRENT_DOWNLOADS")? {
            resolver = resolver.with_max_concurrent_downloads(max);
        }
        if let Some(capacity) = parse_var::<usize>("CITEIT_CACHE_CAPACITY")? {
            resolver = resolver.with_cache_capacity(capacity);
        }
        if let Some(secs) = parse_var::<u64>("CITEIT_OCR_PAGE_TIMEOUT_SECS")? {
            resolver = resolver.with_ocr_page_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64>("CITEIT_REQUEST_TIMEOUT_SECS")? {
            resolver.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(language) = env::var("CITEIT_OCR_LANGUAGE") {
            resolver.ocr_language = language;
        }

        Ok(Self {
            resolver,
            database_url: env::var("DATABASE_URL").ok(),
        })
    }
}

/// Parse an optional variable, failing on a malformed value.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a valid value")),
        Err(_) => Ok(None),
    }
}
