//! Provider transcripts: YouTube captions and Oyez oral arguments.
//!
//! Transcripts are cached under `<provider>:<native id>` and the cache is
//! consulted before any provider call.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::canonical::quote_plus;
use crate::error::{DocumentError, Result};
use crate::extract::pdf::run_tool;
use crate::extract::text::normalize_whitespace;
use crate::extract::{ExtractionEngine, ExtractionOutcome};
use crate::provider::{provider_key, route, Provider, ProviderKey};
use crate::traits::extractor::{SubtitleSource, TranscriptSource};
use crate::types::cache::{keys, CacheEntry};

pub const VIMEO_NOTICE: &str = "Vimeo transcripts not yet implemented.";

pub const OYEZ_API_BASE: &str = "https://api.oyez.org";

static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}:\d{2}:\d{2}[.,]\d{3} --> \d{2}:\d{2}:\d{2}[.,]\d{3}[^\n]*")
        .expect("static regex")
});

static COLOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<c\.color[0-9A-Fa-f]{6}>").expect("static regex"));

static INLINE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:</c>)?<\d{2}:\d{2}:\d{2}[.,]\d{3}>(?:<c>)?").expect("static regex")
});

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("static regex"));

const HEADER_PREFIXES: &[&str] = &["WEBVTT", "Kind:", "Language:", "Style:", "::cue", "##", "NOTE", "}"];

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Caption text of a WebVTT file with timing, styling and overlap removed.
pub fn clean_vtt(vtt: &str) -> String {
    let vtt = strip_cue_identifiers(vtt);
    let text = CUE_TIMING.replace_all(&vtt, "");
    let text = COLOR_TAG.replace_all(&text, "");
    let text = INLINE_TIMESTAMP.replace_all(&text, "");
    let text = MARKUP.replace_all(&text, "");

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !HEADER_PREFIXES.iter().any(|p| line.starts_with(p)))
        .collect();

    let kept = dedupe_caption_lines(&lines);
    normalize_whitespace(&kept.join(" "))
}

/// Drop numeric cue identifiers. An identifier sits directly above its
/// timing line; a number spoken on its own caption line does not.
fn strip_cue_identifiers(vtt: &str) -> String {
    let lines: Vec<&str> = vtt.lines().collect();
    lines
        .iter()
        .enumerate()
        .filter(|(i, line)| {
            let line = line.trim();
            let numeric = !line.is_empty() && line.chars().all(|c| c.is_ascii_digit());
            !(numeric && lines.get(i + 1).is_some_and(|next| CUE_TIMING.is_match(next)))
        })
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse caption-overlap repeats.
///
/// Auto-generated captions repeat each line a fixed number of times as
/// cues scroll. The dominant repeat count N is found by counting how often
/// each line occurs; when N > 1 only every Nth line is kept. Consecutive
/// duplicates are dropped in either case.
pub fn dedupe_caption_lines<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for line in lines {
        *occurrences.entry(*line).or_default() += 1;
    }

    let mut count_frequency: HashMap<usize, usize> = HashMap::new();
    for count in occurrences.values() {
        *count_frequency.entry(*count).or_default() += 1;
    }

    // Ties resolve to the smaller count, which keeps more text.
    let step = count_frequency
        .iter()
        .max_by(|(count_a, freq_a), (count_b, freq_b)| {
            freq_a.cmp(freq_b).then(count_b.cmp(count_a))
        })
        .map(|(count, _)| *count)
        .unwrap_or(1)
        .max(1);

    let mut kept: Vec<&str> = Vec::with_capacity(lines.len() / step + 1);
    for line in lines.iter().step_by(step) {
        if kept.last() != Some(line) {
            kept.push(*line);
        }
    }
    kept
}

#[derive(Debug, Default, Deserialize)]
struct OyezMedia {
    #[serde(default)]
    transcript: Option<OyezTranscript>,
}

#[derive(Debug, Default, Deserialize)]
struct OyezTranscript {
    #[serde(default)]
    sections: Vec<OyezSection>,
}

#[derive(Debug, Default, Deserialize)]
struct OyezSection {
    #[serde(default)]
    turns: Vec<OyezTurn>,
}

#[derive(Debug, Default, Deserialize)]
struct OyezTurn {
    #[serde(default)]
    text_blocks: Vec<OyezTextBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct OyezTextBlock {
    #[serde(default)]
    text: String,
}

/// Flatten sections, turns and text blocks into paragraphs, skipping a
/// block identical to the one before it.
pub fn flatten_oyez(value: &serde_json::Value) -> Result<String> {
    let media: OyezMedia = serde_json::from_value(value.clone())
        .map_err(|e| DocumentError::extraction("oyez", e))?;

    let mut paragraphs: Vec<&str> = Vec::new();
    let blocks = media
        .transcript
        .iter()
        .flat_map(|t| &t.sections)
        .flat_map(|s| &s.turns)
        .flat_map(|t| &t.text_blocks);

    for block in blocks {
        let text = block.text.trim();
        if text.is_empty() || paragraphs.last() == Some(&text) {
            continue;
        }
        paragraphs.push(text);
    }

    Ok(paragraphs.join("\n\n"))
}

impl ExtractionEngine {
    /// Transcript text for media-hosting URLs, empty for everything else.
    pub async fn supplemental_text(&self, url: &str) -> ExtractionOutcome {
        match route(url) {
            None | Some(Provider::SoundCloud) => return ExtractionOutcome::Text(String::new()),
            Some(Provider::Vimeo) => return ExtractionOutcome::Text(VIMEO_NOTICE.to_string()),
            Some(Provider::YouTube) | Some(Provider::Oyez) => {}
        }

        let Some(key) = provider_key(url) else {
            debug!(url = %url, "Provider URL without a native id");
            return ExtractionOutcome::Text(String::new());
        };
        let cache_key = key.cache_key();

        match self.transcript_cache.get(&cache_key).await {
            Ok(Some(entry)) => {
                info!(key = %cache_key, "Transcript cache hit");
                return ExtractionOutcome::Text(entry.text);
            }
            Ok(None) => {}
            Err(e) => warn!(key = %cache_key, error = %e, "Transcript cache read failed"),
        }

        let fetched = match self.fetch_transcript(&key).await {
            Ok(fetched) => fetched,
            Err(error) => {
                return ExtractionOutcome::Unavailable {
                    error,
                    notice: String::new(),
                }
            }
        };

        let Some(text) = fetched else {
            debug!(key = %cache_key, "No transcript available");
            return ExtractionOutcome::Text(String::new());
        };

        let entry = CacheEntry::new(&cache_key, &text)
            .with_metadata(keys::PROVIDER, key.provider.as_str());
        if let Err(e) = self.transcript_cache.put(&entry).await {
            warn!(key = %cache_key, error = %e, "Transcript cache write failed");
        }
        self.archive_text(&format!("transcripts/{}.txt", quote_plus(&cache_key)), &text)
            .await;

        ExtractionOutcome::Text(text)
    }

    async fn fetch_transcript(&self, key: &ProviderKey) -> Result<Option<String>> {
        match key.provider {
            Provider::YouTube => {
                let source = self.capabilities.subtitles.as_ref().ok_or_else(|| {
                    DocumentError::ExtractionUnavailable {
                        capability: "subtitles".to_string(),
                    }
                })?;
                let vtt = source.english_captions(&key.native_id).await?;
                Ok(vtt.map(|vtt| clean_vtt(&vtt)))
            }
            Provider::Oyez => {
                let source = self.capabilities.transcripts.as_ref().ok_or_else(|| {
                    DocumentError::ExtractionUnavailable {
                        capability: "transcripts".to_string(),
                    }
                })?;
                match source.transcript_json(&key.native_id).await? {
                    Some(json) => flatten_oyez(&json).map(Some),
                    None => Ok(None),
                }
            }
            Provider::Vimeo | Provider::SoundCloud => Ok(None),
        }
    }
}

/// English captions through the `yt-dlp` command-line tool.
#[derive(Debug, Clone)]
pub struct YtDlpSubtitles {
    program: String,
    work_dir: PathBuf,
}

impl Default for YtDlpSubtitles {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpSubtitles {
    pub fn new() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            work_dir: std::env::temp_dir(),
        }
    }

    /// Use a different executable, e.g. `youtube-dl`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }
}

#[async_trait]
impl SubtitleSource for YtDlpSubtitles {
    async fn english_captions(&self, video_id: &str) -> Result<Option<String>> {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let stem = self
            .work_dir
            .join(format!("citeit-subs-{}-{}", std::process::id(), n));
        let template = format!("{}.%(ext)s", stem.display());
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");

        run_tool(
            &self.program,
            &[
                "--skip-download",
                "--write-subs",
                "--write-auto-subs",
                "--sub-langs",
                "en",
                "--sub-format",
                "vtt",
                "-o",
                &template,
                &watch_url,
            ],
        )
        .await?;

        let vtt_path = PathBuf::from(format!("{}.en.vtt", stem.display()));
        match tokio::fs::read_to_string(&vtt_path).await {
            Ok(vtt) => {
                let _ = tokio::fs::remove_file(&vtt_path).await;
                Ok(Some(vtt))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DocumentError::extraction(&self.program, e)),
        }
    }
}

/// Oral-argument transcripts from the Oyez API.
#[derive(Debug, Clone)]
pub struct OyezApi {
    client: reqwest::Client,
    base_url: String,
}

impl Default for OyezApi {
    fn default() -> Self {
        Self::new()
    }
}

impl OyezApi {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: OYEZ_API_BASE.to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// API URL of a case's oral-argument media.
    pub fn media_url(&self, case_id: &str) -> String {
        format!("{}/case_media/oral_argument_audio/{}", self.base_url, case_id)
    }
}

#[async_trait]
impl TranscriptSource for OyezApi {
    async fn transcript_json(&self, case_id: &str) -> Result<Option<serde_json::Value>> {
        let url = self.media_url(case_id);
        debug!(url = %url, "Fetching Oyez transcript");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DocumentError::extraction("oyez", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(DocumentError::extraction(
                "oyez",
                format!("HTTP {}", response.status()),
            ));
        }

        let json = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| DocumentError::extraction("oyez", e))?;
        Ok(Some(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSubtitles, MockTranscripts};
    use crate::traits::extractor::Capabilities;
    use crate::traits::store::TextCache;
    use crate::stores::MemoryCache;
    use serde_json::json;
    use std::sync::Arc;

    const AUTO_VTT: &str = "WEBVTT
Kind: captions
Language: en

00:00:00.000 --> 00:00:02.000 align:start position:0%
we<00:00:00.500><c> hold</c><00:00:01.000><c> these</c>

00:00:02.000 --> 00:00:02.010 align:start position:0%
we hold these

00:00:02.010 --> 00:00:04.000 align:start position:0%
we hold these
<c.colorE5E5E5>truths to be</c>

00:00:04.000 --> 00:00:04.010 align:start position:0%
truths to be
";

    #[test]
    fn test_clean_vtt_collapses_overlap() {
        assert_eq!(clean_vtt(AUTO_VTT), "we hold these truths to be");
    }

    #[test]
    fn test_unique_lines_kept() {
        let vtt = "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nFour score\n\n2\n00:00:01.000 --> 00:00:02.000\nand seven years ago\n";
        assert_eq!(clean_vtt(vtt), "Four score and seven years ago");
    }

    #[test]
    fn test_spoken_numbers_survive() {
        let vtt = "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nIn the year\n\n2\n00:00:01.000 --> 00:00:02.000\n1776\n";
        assert_eq!(clean_vtt(vtt), "In the year 1776");
    }

    #[test]
    fn test_dedupe_by_dominant_count() {
        let lines = ["a", "a", "a", "b", "b", "b", "c", "c", "c"];
        assert_eq!(dedupe_caption_lines(&lines), vec!["a", "b", "c"]);

        let lines = ["a", "b", "c"];
        assert_eq!(dedupe_caption_lines(&lines), vec!["a", "b", "c"]);
        assert!(dedupe_caption_lines(&[]).is_empty());
    }

    #[test]
    fn test_flatten_oyez() {
        let value = json!({
            "transcript": {
                "sections": [
                    {"turns": [
                        {"text_blocks": [{"text": "Mr. Chief Justice."}, {"text": "May it please the Court."}]},
                        {"text_blocks": [{"text": "May it please the Court."}]}
                    ]},
                    {"turns": [{"text_blocks": [{"text": "Thank you."}]}]}
                ]
            }
        });
        assert_eq!(
            flatten_oyez(&value).unwrap(),
            "Mr. Chief Justice.\n\nMay it please the Court.\n\nThank you."
        );
        assert_eq!(flatten_oyez(&json!({"transcript": null})).unwrap(), "");
    }

    #[test]
    fn test_oyez_media_url() {
        let api = OyezApi::new();
        assert_eq!(
            api.media_url("16543"),
            "https://api.oyez.org/case_media/oral_argument_audio/16543"
        );
    }

    #[tokio::test]
    async fn test_youtube_transcript_is_cached() {
        let subtitles = MockSubtitles::new().with_captions("abc123", AUTO_VTT);
        let cache = Arc::new(MemoryCache::new(10));
        let engine = ExtractionEngine::new(Capabilities::none().with_subtitles(subtitles.clone()))
            .with_transcript_cache(cache.clone());

        let url = "https://www.youtube.com/watch?v=abc123";
        let first = engine.supplemental_text(url).await;
        let second = engine.supplemental_text(url).await;

        assert_eq!(first.text(), "we hold these truths to be");
        assert_eq!(second.text(), first.text());
        assert_eq!(subtitles.call_count(), 1);

        let entry = cache.get("youtube:abc123").await.unwrap().unwrap();
        assert_eq!(entry.meta(keys::PROVIDER), "youtube");
    }

    #[tokio::test]
    async fn test_no_captions_is_empty() {
        let engine = ExtractionEngine::new(Capabilities::none().with_subtitles(MockSubtitles::new()));
        let outcome = engine.supplemental_text("https://youtu.be/missing").await;
        assert_eq!(outcome.text(), "");
        assert!(outcome.error().is_none());
    }

    #[tokio::test]
    async fn test_oyez_transcript() {
        let transcripts = MockTranscripts::new().with_transcript(
            "16543",
            json!({"transcript": {"sections": [{"turns": [{"text_blocks": [{"text": "Argued."}]}]}]}}),
        );
        let engine = ExtractionEngine::new(Capabilities::none().with_transcripts(transcripts));

        let outcome = engine
            .supplemental_text("https://apps.oyez.org/player/#/burger6/oral_argument_audio/16543")
            .await;
        assert_eq!(outcome.text(), "Argued.");
    }

    #[tokio::test]
    async fn test_malformed_oyez_transcript_is_an_extraction_error() {
        let transcripts = MockTranscripts::new()
            .with_transcript("16543", json!({"transcript": {"sections": "not a list"}}));
        let engine = ExtractionEngine::new(Capabilities::none().with_transcripts(transcripts));

        let outcome = engine
            .supplemental_text("https://apps.oyez.org/player/#/burger6/oral_argument_audio/16543")
            .await;
        assert_eq!(outcome.text(), "");
        let error = outcome.error().expect("error reported");
        assert_eq!(error.kind(), crate::error::ErrorKind::ExtractionUnavailable);
    }

    #[tokio::test]
    async fn test_provider_notices() {
        let engine = ExtractionEngine::new(Capabilities::none());
        assert_eq!(engine.supplemental_text("https://vimeo.com/1").await.text(), VIMEO_NOTICE);
        assert_eq!(engine.supplemental_text("https://soundcloud.com/a/b").await.text(), "");
        assert_eq!(engine.supplemental_text("https://example.com/").await.text(), "");

        let missing = engine.supplemental_text("https://youtu.be/abc").await;
        assert!(matches!(
            missing.error(),
            Some(DocumentError::ExtractionUnavailable { .. })
        ));
    }
}
