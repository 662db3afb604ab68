//! URL normalization, canonical discovery and archive naming.
//!
//! Identities used as cache keys and archive names are protocol-stripped,
//! so `http://` and `https://` variants of a page share one entry.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::error::{DocumentError, Result};
use crate::types::doc_type::DocType;

/// Characters `quote_plus` leaves alone besides alphanumerics. Space is kept
/// here and turned into `+` afterwards.
const QUOTE_PLUS: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ');

static CANONICAL_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel~="canonical"][href]"#).expect("static selector")
});

static OG_URL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:url"][content]"#).expect("static selector")
});

/// A validated URL plus its protocol-stripped identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    url: Url,
    key: String,
}

impl NormalizedUrl {
    /// The parsed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Protocol-stripped form, used as the cache key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }
}

/// Validate a user-supplied URL.
///
/// The input must literally contain `scheme://authority`; the WHATWG parser
/// alone would repair `ftp:/bad` into `ftp://bad/`, which is not what the
/// user typed.
pub fn normalize(raw_url: &str) -> Result<NormalizedUrl> {
    let raw = raw_url.trim();
    let invalid = |reason: &str| DocumentError::InvalidUrl {
        url: raw_url.to_string(),
        reason: reason.to_string(),
    };

    let (scheme, rest) = raw
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme or authority"))?;

    let scheme_ok = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(invalid("missing scheme"));
    }

    let authority = rest.split(&['/', '?', '#'][..]).next().unwrap_or("");
    if authority.is_empty() {
        return Err(invalid("missing authority"));
    }

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    let key = strip_protocol(raw).to_string();
    Ok(NormalizedUrl { url, key })
}

/// Remove the `scheme://` prefix, leaving everything else untouched.
pub fn strip_protocol(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest,
        None => url,
    }
}

/// Canonical URL declared by the page, resolved against `source` and
/// protocol-stripped. Falls back to the protocol-stripped source URL.
pub fn canonicalize(source: &Url, html: &str) -> String {
    canonicalize_at(source, source, html)
}

/// Like [`canonicalize`], but relative declarations resolve against `base`,
/// the address the page was finally served from after redirects.
pub fn canonicalize_at(source: &Url, base: &Url, html: &str) -> String {
    match find_declared_canonical(html) {
        Some(declared) => match base.join(declared.trim()) {
            Ok(resolved) => strip_protocol(resolved.as_str()).to_string(),
            Err(_) => strip_protocol(source.as_str()).to_string(),
        },
        None => strip_protocol(source.as_str()).to_string(),
    }
}

/// `<link rel="canonical">` wins over `<meta property="og:url">`.
pub fn find_declared_canonical(html: &str) -> Option<String> {
    if html.is_empty() {
        return None;
    }
    let document = Html::parse_document(html);

    document
        .select(&CANONICAL_LINK)
        .filter_map(|el| el.value().attr("href"))
        .chain(
            document
                .select(&OG_URL)
                .filter_map(|el| el.value().attr("content")),
        )
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Identity used for citation lookup: the canonical URL without protocol,
/// fragment or trailing slash.
pub fn citeit_url(canonical_url: &str) -> String {
    let without_protocol = strip_protocol(canonical_url);
    let without_fragment = without_protocol
        .split_once('#')
        .map_or(without_protocol, |(head, _)| head);
    without_fragment.trim_end_matches('/').to_string()
}

/// Form-style percent encoding: `/` becomes
/// `%2F` and spaces become `+`.
pub fn quote_plus(value: &str) -> String {
    utf8_percent_encode(value, QUOTE_PLUS)
        .to_string()
        .replace(' ', "+")
}

/// Archive key of the original payload: `<doc_type>/<quoted canonical>`.
pub fn archive_path(doc_type: &DocType, canonical_without_protocol: &str) -> String {
    format!("{}/{}", doc_type.tag(), quote_plus(canonical_without_protocol))
}

/// Archive key of the extracted text artifact.
pub fn text_path(doc_type: &DocType, canonical_without_protocol: &str) -> String {
    format!("{}.txt", archive_path(doc_type, canonical_without_protocol))
}

/// Archive key of a single OCR'd page, numbered from zero.
pub fn ocr_page_path(canonical_without_protocol: &str, page: usize) -> String {
    format!(
        "{}@@-page-{:04}.txt",
        text_path(&DocType::Pdf, canonical_without_protocol),
        page
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_normalize_accepts_http_urls() {
        let url = normalize("  https://example.com/a?b=1  ").unwrap();
        assert_eq!(url.key(), "example.com/a?b=1");
        assert_eq!(url.host(), "example.com");
    }

    #[test]
    fn test_normalize_rejects_missing_authority() {
        for bad in ["ftp:/bad", "example.com/a", "https:///path", "://host", "", "1http://x"] {
            let err = normalize(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidUrl, "{bad}");
        }
    }

    #[test]
    fn test_strip_protocol() {
        assert_eq!(strip_protocol("https://example.com/a"), "example.com/a");
        assert_eq!(strip_protocol("http://example.com/a"), "example.com/a");
        assert_eq!(strip_protocol("example.com/a"), "example.com/a");
        assert_eq!(
            strip_protocol("https://example.com/a"),
            strip_protocol("http://example.com/a")
        );
    }

    #[test]
    fn test_canonical_link_wins() {
        let source = Url::parse("https://example.com/a?utm=x").unwrap();
        let html = r#"<html><head>
            <meta property="og:url" content="https://example.com/og">
            <link rel="canonical" href="/articles/a">
        </head><body></body></html>"#;
        assert_eq!(canonicalize(&source, html), "example.com/articles/a");
    }

    #[test]
    fn test_og_url_fallback() {
        let source = Url::parse("https://example.com/a").unwrap();
        let html = r#"<head><meta property="og:url" content="https://www.example.com/a"></head>"#;
        assert_eq!(canonicalize(&source, html), "www.example.com/a");
    }

    #[test]
    fn test_no_declared_canonical() {
        let source = Url::parse("https://example.com/a").unwrap();
        assert_eq!(canonicalize(&source, "<p>hi</p>"), "example.com/a");
        assert_eq!(canonicalize(&source, ""), "example.com/a");
    }

    #[test]
    fn test_relative_canonical_resolves_against_redirect_target() {
        let source = Url::parse("http://old.example.com/a/b").unwrap();
        let served = Url::parse("https://www.example.org/news/2020/x").unwrap();
        let html = r#"<head><link rel="canonical" href="article"></head>"#;
        assert_eq!(
            canonicalize_at(&source, &served, html),
            "www.example.org/news/2020/article"
        );
        // Without a declaration the requested URL stays canonical.
        assert_eq!(canonicalize_at(&source, &served, "<p>hi</p>"), "old.example.com/a/b");
    }

    #[test]
    fn test_citeit_url() {
        assert_eq!(citeit_url("https://example.com/a/#top"), "example.com/a");
        assert_eq!(citeit_url("example.com/"), "example.com");
    }

    #[test]
    fn test_archive_naming() {
        assert_eq!(quote_plus("example.com/a b?x=1"), "example.com%2Fa+b%3Fx%3D1");
        assert_eq!(
            archive_path(&DocType::Html, "avalon.law.yale.edu/19th_century/jeffauto.asp"),
            "html/avalon.law.yale.edu%2F19th_century%2Fjeffauto.asp"
        );
        assert_eq!(text_path(&DocType::Pdf, "x.org/a.pdf"), "pdf/x.org%2Fa.pdf.txt");
        assert_eq!(
            ocr_page_path("x.org/a.pdf", 3),
            "pdf/x.org%2Fa.pdf.txt@@-page-0003.txt"
        );
    }
}
