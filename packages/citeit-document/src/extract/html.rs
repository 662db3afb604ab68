//! Visible text of an HTML page.

use scraper::Html;

use crate::charset::repair_mojibake;
use crate::extract::text::normalize_text;

/// Elements whose content never reaches a reader.
const INVISIBLE: &[&str] = &["style", "script", "head", "title", "noscript", "template"];

/// Elements that start a new line of text when rendered.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Concatenate the visible text nodes of a document.
///
/// Block-level elements are separated by a space so adjacent cells or
/// paragraphs do not run together; inline markup adds nothing.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);

    for node in document.root_element().descendants() {
        if let Some(element) = node.value().as_element() {
            if BLOCK.contains(&element.name()) {
                out.push(' ');
            }
            continue;
        }

        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }

    out
}

/// Readable, normalized text of an HTML page.
pub fn extract_html_text(html: &str) -> String {
    normalize_text(&repair_mojibake(&visible_text(html)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_world() {
        let html = "<html><head><title>t</title></head><body>  Hello   World  </body></html>";
        assert_eq!(extract_html_text(html), "Hello World");
    }

    #[test]
    fn test_skips_invisible_elements() {
        let html = r#"<html><head><style>p { color: red }</style><script>var x = 1;</script></head>
            <body><script>alert('x')</script><noscript>enable js</noscript><p>Visible</p></body></html>"#;
        assert_eq!(extract_html_text(html), "Visible");
    }

    #[test]
    fn test_blocks_are_separated_inline_is_not() {
        let html = "<body><p>One</p><p>Two</p><table><tr><td>a</td><td>b</td></tr></table><p>wo<b>rd</b></p></body>";
        assert_eq!(extract_html_text(html), "One Two a b word");
    }

    #[test]
    fn test_entities_and_quotes() {
        let html = "<p>&ldquo;Don&rsquo;t&rdquo; &amp; won&#39;t&nbsp;stop</p>";
        assert_eq!(extract_html_text(html), "\"Don't\" & won't stop");
    }

    #[test]
    fn test_mojibake_is_repaired() {
        let html = "<p>donâ€™t</p>";
        assert_eq!(extract_html_text(html), "don't");
    }
}
