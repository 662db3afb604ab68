//! Character-set resolution and decoding.
//!
//! The charset is resolved, never assumed: override table, then the
//! content-type header, then an HTML `<meta>` sniff, then UTF-8 validity,
//! then windows-1252.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::canonical::strip_protocol;

/// Bytes of body inspected for a `<meta charset>` declaration.
const SNIFF_LIMIT: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#).expect("static regex")
});

/// `charset` parameter of a content-type header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches(&['"', '\''][..]).to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

/// Charset declared in the first kilobyte of an HTML body.
pub fn sniff_meta_charset(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(SNIFF_LIMIT)];
    META_CHARSET
        .captures(head)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).to_ascii_lowercase())
}

/// Override for a URL, matched on the protocol-stripped URL first and then
/// on the bare host.
pub fn override_for<'a>(
    overrides: &'a HashMap<String, String>,
    url: &str,
    host: &str,
) -> Option<&'a String> {
    overrides
        .get(strip_protocol(url))
        .or_else(|| overrides.get(host))
}

/// Resolve the charset label for a response body.
pub fn resolve_encoding(
    overrides: &HashMap<String, String>,
    url: &str,
    host: &str,
    content_type: &str,
    body: &[u8],
) -> String {
    if let Some(label) = override_for(overrides, url, host) {
        return label.to_ascii_lowercase();
    }
    if let Some(label) = charset_from_content_type(content_type) {
        return label;
    }
    if content_type.to_ascii_lowercase().contains("html") || content_type.trim().is_empty() {
        if let Some(label) = sniff_meta_charset(body) {
            return label;
        }
    }
    if std::str::from_utf8(body).is_ok() {
        "utf-8".to_string()
    } else {
        "windows-1252".to_string()
    }
}

/// Outcome of decoding a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// Canonical name of the encoding actually used
    pub encoding: String,
    /// The requested label was not a known encoding
    pub unknown_label: bool,
    /// Malformed sequences were replaced
    pub had_errors: bool,
}

/// Decode `body` with `label`. Unknown labels fall back to lossy UTF-8.
pub fn decode(body: &[u8], label: &str) -> Decoded {
    let (encoding, unknown_label) = match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) => (encoding, false),
        None => (UTF_8, true),
    };
    let (text, used, had_errors) = encoding.decode(body);
    Decoded {
        text: text.into_owned(),
        encoding: used.name().to_ascii_lowercase(),
        unknown_label,
        had_errors,
    }
}

/// Undo UTF-8 text that was decoded as windows-1252 ("â€™" for "’").
///
/// Applied only when mojibake markers are present and the round trip is
/// lossless; otherwise the input is returned untouched.
pub fn repair_mojibake(text: &str) -> String {
    const MARKERS: [&str; 3] = ["â€", "Ã©", "Ã¨"];
    if !MARKERS.iter().any(|m| text.contains(m)) {
        return text.to_string();
    }

    let (bytes, _, unmappable) = WINDOWS_1252.encode(text);
    if unmappable {
        return text.to_string();
    }
    match std::str::from_utf8(&bytes) {
        Ok(repaired) => repaired.to_string(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_from_header() {
        assert_eq!(
            charset_from_content_type("text/html; charset=ISO-8859-1").as_deref(),
            Some("iso-8859-1")
        );
        assert_eq!(
            charset_from_content_type("text/html;charset=\"utf-8\"").as_deref(),
            Some("utf-8")
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn test_meta_sniff() {
        let body = br#"<html><head><meta charset="Shift_JIS"></head>"#;
        assert_eq!(sniff_meta_charset(body).as_deref(), Some("shift_jis"));

        let body = br#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1251">"#;
        assert_eq!(sniff_meta_charset(body).as_deref(), Some("windows-1251"));
    }

    #[test]
    fn test_override_beats_header() {
        let overrides = HashMap::from([("example.com/legacy".to_string(), "windows-1252".to_string())]);
        let label = resolve_encoding(
            &overrides,
            "https://example.com/legacy",
            "example.com",
            "text/html; charset=utf-8",
            b"",
        );
        assert_eq!(label, "windows-1252");
    }

    #[test]
    fn test_host_override() {
        let overrides = HashMap::from([("old.example.com".to_string(), "ISO-8859-1".to_string())]);
        let label = resolve_encoding(&overrides, "http://old.example.com/x", "old.example.com", "", b"");
        assert_eq!(label, "iso-8859-1");
    }

    #[test]
    fn test_fallbacks_without_declaration() {
        let none = HashMap::new();
        assert_eq!(resolve_encoding(&none, "u", "h", "text/plain", "café".as_bytes()), "utf-8");
        assert_eq!(resolve_encoding(&none, "u", "h", "text/plain", &[0x63, 0x61, 0x66, 0xe9]), "windows-1252");
    }

    #[test]
    fn test_decode_windows_1252() {
        let decoded = decode(&[0x63, 0x61, 0x66, 0xe9], "windows-1252");
        assert_eq!(decoded.text, "café");
        assert!(!decoded.unknown_label);
    }

    #[test]
    fn test_decode_unknown_label_falls_back() {
        let decoded = decode("hello".as_bytes(), "x-not-a-charset");
        assert_eq!(decoded.text, "hello");
        assert!(decoded.unknown_label);
        assert_eq!(decoded.encoding, "utf-8");
    }

    #[test]
    fn test_repair_mojibake() {
        assert_eq!(repair_mojibake("donâ€™t"), "don\u{2019}t");
        assert_eq!(repair_mojibake("plain text"), "plain text");
    }
}
