//! Language detection.
//!
//! A dependency-free heuristic: Unicode script counts pick the language
//! for non-Latin scripts, and a stop-word vote separates the common
//! Latin-script languages.

/// Minimum alphabetic characters before a guess is made.
const MIN_LETTERS: usize = 3;

/// Script ranges mapped to an ISO 639-1 code.
const SCRIPTS: &[(char, char, &str)] = &[
    ('\u{3040}', '\u{30ff}', "ja"),
    ('\u{ac00}', '\u{d7af}', "ko"),
    ('\u{1100}', '\u{11ff}', "ko"),
    ('\u{4e00}', '\u{9fff}', "zh"),
    ('\u{0400}', '\u{04ff}', "ru"),
    ('\u{0600}', '\u{06ff}', "ar"),
    ('\u{0590}', '\u{05ff}', "he"),
    ('\u{0370}', '\u{03ff}', "el"),
    ('\u{0e00}', '\u{0e7f}', "th"),
    ('\u{0900}', '\u{097f}', "hi"),
];

const STOP_WORDS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "of", "to", "is", "that", "in", "it", "was", "for", "with", "this"]),
    ("de", &["der", "die", "und", "das", "ist", "nicht", "mit", "ein", "sie", "auf", "ich", "zu"]),
    ("fr", &["le", "la", "les", "et", "est", "une", "des", "du", "que", "pas", "pour", "dans"]),
    ("es", &["el", "los", "las", "y", "es", "una", "del", "que", "por", "con", "para", "como"]),
    ("it", &["il", "di", "che", "è", "non", "per", "una", "gli", "della", "sono", "con", "nel"]),
    ("pt", &["o", "os", "e", "não", "uma", "do", "da", "que", "com", "para", "em", "por"]),
    ("nl", &["de", "het", "een", "en", "van", "niet", "is", "dat", "op", "zijn", "met", "voor"]),
];

/// Detect the language of `text`, returning an ISO 639-1 code.
///
/// Returns `None` for empty or letter-poor input.
pub fn detect_language(text: &str) -> Option<String> {
    let mut script_counts = vec![0usize; SCRIPTS.len()];
    let mut latin = 0usize;
    let mut letters = 0usize;

    for c in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if let Some(idx) = SCRIPTS
            .iter()
            .position(|(lo, hi, _)| (*lo..=*hi).contains(&c))
        {
            script_counts[idx] += 1;
        } else if c.is_ascii_alphabetic() || ('\u{00c0}'..='\u{024f}').contains(&c) {
            latin += 1;
        }
    }

    if letters < MIN_LETTERS {
        return None;
    }

    // Kana outranks Han: Japanese text mixes both.
    let kana = script_counts[0];
    if kana > 0 && kana * 10 >= letters {
        return Some("ja".to_string());
    }

    let (best_idx, best) = script_counts
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)
        .map(|(idx, count)| (idx, *count))
        .unwrap_or((0, 0));

    if best > latin {
        return Some(SCRIPTS[best_idx].2.to_string());
    }

    Some(latin_language(text).to_string())
}

/// Stop-word vote among Latin-script languages; English on ties.
fn latin_language(text: &str) -> &'static str {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut best = ("en", 0usize);
    for (code, stop_words) in STOP_WORDS {
        let hits = words
            .iter()
            .filter(|w| stop_words.contains(&w.as_str()))
            .count();
        if hits > best.1 {
            best = (code, hits);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english() {
        assert_eq!(
            detect_language("It was the best of times, it was the worst of times").as_deref(),
            Some("en")
        );
    }

    #[test]
    fn test_latin_languages() {
        assert_eq!(
            detect_language("Der Hund ist nicht mit der Katze auf dem Sofa").as_deref(),
            Some("de")
        );
        assert_eq!(
            detect_language("Le chat est dans la maison et les enfants sont pour le jardin").as_deref(),
            Some("fr")
        );
        assert_eq!(
            detect_language("El perro y los gatos son para la casa con una puerta").as_deref(),
            Some("es")
        );
    }

    #[test]
    fn test_scripts() {
        assert_eq!(detect_language("Привет, как дела?").as_deref(), Some("ru"));
        assert_eq!(detect_language("これは日本語の文章です").as_deref(), Some("ja"));
        assert_eq!(detect_language("这是中文文本内容").as_deref(), Some("zh"));
        assert_eq!(detect_language("안녕하세요 반갑습니다").as_deref(), Some("ko"));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(detect_language(""), None);
        assert_eq!(detect_language("12 34 !!"), None);
    }
}
