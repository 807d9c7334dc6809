//! Structured-output extraction from free-form model responses, plus the
//! deterministic fallbacks steps apply when extraction fails.
//!
//! Extraction is two-stage: the first fenced code block (optionally tagged
//! `json`) is tried first, then the whole trimmed response.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use blogwriter_shared::{AnalyzedContent, BlogWriterError, Result, SeoMeta};

/// Longest source text handed to the model, in characters.
pub const MAX_RAW_CONTENT_CHARS: usize = 10_000;

/// Appended to source text cut at [`MAX_RAW_CONTENT_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Keyword suggestions are capped at this many entries.
pub const MAX_SUGGESTED_KEYWORDS: usize = 3;

/// How much of the blog post the SEO prompt sees.
pub const SEO_INPUT_CHARS: usize = 3_000;

/// Length of the fallback meta description.
pub const SEO_DESCRIPTION_CHARS: usize = 160;

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("valid regex"));

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("valid regex"));

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// The first `max_chars` characters of `text`.
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Cut fetched content to [`MAX_RAW_CONTENT_CHARS`], marking the cut.
pub fn truncate_raw_content(content: String) -> String {
    if content.chars().count() <= MAX_RAW_CONTENT_CHARS {
        content
    } else {
        format!("{}{TRUNCATION_MARKER}", prefix_chars(&content, MAX_RAW_CONTENT_CHARS))
    }
}

// ---------------------------------------------------------------------------
// Two-stage JSON extraction
// ---------------------------------------------------------------------------

/// Parse `T` from a fenced block in `response`, else from the whole text.
pub fn extract_json<T: DeserializeOwned>(response: &str) -> Result<T> {
    if let Some(caps) = FENCED_RE.captures(response) {
        if let Ok(value) = serde_json::from_str::<T>(caps[1].trim()) {
            return Ok(value);
        }
    }

    serde_json::from_str::<T>(response.trim())
        .map_err(|e| BlogWriterError::parse(format!("no usable JSON in model response: {e}")))
}

/// Like [`extract_json`], but only a JSON object is accepted.
fn extract_object<T: DeserializeOwned>(response: &str) -> Result<T> {
    let value: Value = extract_json(response)?;
    if !value.is_object() {
        return Err(BlogWriterError::parse("model response is not a JSON object"));
    }
    serde_json::from_value(value)
        .map_err(|e| BlogWriterError::parse(format!("unexpected JSON shape: {e}")))
}

// ---------------------------------------------------------------------------
// Content analysis
// ---------------------------------------------------------------------------

/// Parse an analysis record. Missing fields take their defaults.
pub fn parse_analysis(response: &str) -> Result<AnalyzedContent> {
    extract_object(response)
}

/// Synthetic analysis built from the raw content itself.
pub fn fallback_analysis(raw_content: &str) -> AnalyzedContent {
    AnalyzedContent {
        title: "Untitled".into(),
        main_topic: prefix_chars(raw_content, 200).to_string(),
        key_points: Vec::new(),
        summary: prefix_chars(raw_content, 500).to_string(),
        tone: "neutral".into(),
    }
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordPayload {
    Object {
        #[serde(default)]
        keywords: Vec<String>,
    },
    List(Vec<String>),
}

/// Parse `{"keywords": [...]}` or a bare string array, capped at
/// [`MAX_SUGGESTED_KEYWORDS`].
pub fn parse_keywords(response: &str) -> Result<Vec<String>> {
    let keywords = match extract_json::<KeywordPayload>(response)? {
        KeywordPayload::Object { keywords } | KeywordPayload::List(keywords) => keywords,
    };
    Ok(keywords.into_iter().take(MAX_SUGGESTED_KEYWORDS).collect())
}

/// Every double-quoted substring of `response`, capped at
/// [`MAX_SUGGESTED_KEYWORDS`]. May return fewer, or none.
pub fn quoted_keywords(response: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(response)
        .map(|caps| caps[1].to_string())
        .take(MAX_SUGGESTED_KEYWORDS)
        .collect()
}

// ---------------------------------------------------------------------------
// SEO
// ---------------------------------------------------------------------------

pub fn parse_seo(response: &str) -> Result<SeoMeta> {
    extract_object(response)
}

/// Generic title plus the opening of the post as description.
pub fn fallback_seo(blog_markdown: &str) -> SeoMeta {
    SeoMeta {
        title: "Blog Post".into(),
        description: prefix_chars(blog_markdown, SEO_DESCRIPTION_CHARS).to_string(),
    }
}
