//! Media-provider routing.
//!
//! Recognizes hosts whose pages carry a transcript available from a
//! dedicated API. Matching is exact on the registered `(domain, suffix)`
//! pair so `notyoutube.com` or `youtube.example.org` never match.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

static TRAILING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)/*$").expect("static regex"));

/// A recognized transcript-bearing host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    YouTube,
    Vimeo,
    SoundCloud,
    /// Supreme Court oral-argument transcripts
    Oyez,
}

/// `(domain, suffix)` pairs, matched exactly against the host's last two
/// labels.
const PROVIDER_TABLE: &[(&str, &str, Provider)] = &[
    ("youtube", "com", Provider::YouTube),
    ("youtu", "be", Provider::YouTube),
    ("vimeo", "com", Provider::Vimeo),
    ("soundcloud", "com", Provider::SoundCloud),
    ("oyez", "org", Provider::Oyez),
];

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::YouTube => "youtube",
            Provider::Vimeo => "vimeo",
            Provider::SoundCloud => "soundcloud",
            Provider::Oyez => "oyez",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider plus the native id of the media it hosts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderKey {
    pub provider: Provider,
    pub native_id: String,
}

impl ProviderKey {
    pub fn new(provider: Provider, native_id: impl Into<String>) -> Self {
        Self {
            provider,
            native_id: native_id.into(),
        }
    }

    /// Key in the transcript cache: `<provider>:<native id>`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.provider, self.native_id)
    }
}

/// Split a host into its registered `(domain, suffix)` pair.
fn registered_domain(host: &str) -> Option<(&str, &str)> {
    let host = host.trim_end_matches('.');
    let mut labels = host.rsplit('.');
    let suffix = labels.next()?;
    let domain = labels.next()?;
    Some((domain, suffix))
}

/// Provider for a URL, if its host is one we know.
pub fn route(url: &str) -> Option<Provider> {
    let parsed = Url::parse(url).ok()?;
    route_host(parsed.host_str()?)
}

/// Provider for a bare host name.
pub fn route_host(host: &str) -> Option<Provider> {
    let host = host.to_ascii_lowercase();
    let (domain, suffix) = registered_domain(&host)?;
    PROVIDER_TABLE
        .iter()
        .find(|(d, s, _)| *d == domain && *s == suffix)
        .map(|(_, _, provider)| *provider)
}

/// Provider and native id for a URL. Vimeo and SoundCloud have no id
/// extraction, so they route but never produce a key.
pub fn provider_key(url: &str) -> Option<ProviderKey> {
    let provider = route(url)?;
    let native_id = match provider {
        Provider::YouTube => youtube_video_id(url)?,
        Provider::Oyez => oyez_case_id(url)?,
        Provider::Vimeo | Provider::SoundCloud => return None,
    };
    Some(ProviderKey::new(provider, native_id))
}

/// Video id from the common YouTube URL shapes:
///
/// - `http://youtu.be/SA2iWivDJiE`
/// - `http://www.youtube.com/watch?v=_oPAwA_Udwc&feature=feedu`
/// - `http://www.youtube.com/embed/SA2iWivDJiE`
/// - `http://www.youtube.com/v/SA2iWivDJiE?version=3&hl=en_US`
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let id = match host.as_str() {
        "youtu.be" => segments.next()?.to_string(),
        "youtube.com" | "www.youtube.com" | "m.youtube.com" => match segments.next()? {
            "watch" => parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())?,
            "embed" | "v" => segments.next()?.to_string(),
            _ => return None,
        },
        _ => return None,
    };

    (!id.is_empty()).then_some(id)
}

/// Case id from an Oyez URL: the trailing run of digits.
pub fn oyez_case_id(url: &str) -> Option<String> {
    if route(url) != Some(Provider::Oyez) {
        return None;
    }
    TRAILING_DIGITS
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_known_hosts() {
        assert_eq!(route("https://www.youtube.com/watch?v=abc"), Some(Provider::YouTube));
        assert_eq!(route("https://youtu.be/abc"), Some(Provider::YouTube));
        assert_eq!(route("https://vimeo.com/123"), Some(Provider::Vimeo));
        assert_eq!(route("https://soundcloud.com/a/b"), Some(Provider::SoundCloud));
        assert_eq!(route("https://www.oyez.org/cases/1973/70-18"), Some(Provider::Oyez));
        assert_eq!(route("https://api.oyez.org/case_media/oral_argument_audio/2"), Some(Provider::Oyez));
    }

    #[test]
    fn test_route_is_exact_not_substring() {
        assert_eq!(route("https://notyoutube.com/watch?v=abc"), None);
        assert_eq!(route("https://youtube.example.org/x"), None);
        assert_eq!(route("https://youtube.co.uk/x"), None);
        assert_eq!(route("https://example.com/youtube.com"), None);
        assert_eq!(route("not a url"), None);
    }

    #[test]
    fn test_youtube_video_id_shapes() {
        assert_eq!(youtube_video_id("http://youtu.be/SA2iWivDJiE").as_deref(), Some("SA2iWivDJiE"));
        assert_eq!(
            youtube_video_id("http://www.youtube.com/watch?v=_oPAwA_Udwc&feature=feedu").as_deref(),
            Some("_oPAwA_Udwc")
        );
        assert_eq!(
            youtube_video_id("http://www.youtube.com/embed/SA2iWivDJiE").as_deref(),
            Some("SA2iWivDJiE")
        );
        assert_eq!(
            youtube_video_id("http://www.youtube.com/v/SA2iWivDJiE?version=3&hl=en_US").as_deref(),
            Some("SA2iWivDJiE")
        );
        assert_eq!(youtube_video_id("https://www.youtube.com/channel/x"), None);
    }

    #[test]
    fn test_oyez_case_id() {
        assert_eq!(
            oyez_case_id("https://apps.oyez.org/player/#/burger6/oral_argument_audio/16543").as_deref(),
            Some("16543")
        );
        assert_eq!(oyez_case_id("https://www.oyez.org/cases"), None);
        assert_eq!(oyez_case_id("https://example.com/123"), None);
    }

    #[test]
    fn test_provider_key() {
        let key = provider_key("https://youtu.be/abc123").unwrap();
        assert_eq!(key.cache_key(), "youtube:abc123");
        assert!(provider_key("https://vimeo.com/123").is_none());
        assert!(provider_key("https://example.com/a").is_none());
    }
}
