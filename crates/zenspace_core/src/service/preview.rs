//! Read-only preview projections of entry content.
//!
//! # Responsibility
//! - Define the markup rendering boundary (`MarkupRenderer`).
//! - Reduce Markdown to plain text for terminals and list cards.
//!
//! # Invariants
//! - Rendering is a pure function of the input string.
//! - Only Markdown syntax is removed: block markers at line starts, link and
//!   image wrappers, emphasis delimiters. Other punctuation is kept as text.
//! - Renderer output is HTML-safe (`<`, `>`, `&`, quotes escaped).

use crate::model::entry::Entry;
use once_cell::sync::Lazy;
use regex::Regex;

/// Shown in previews of entries without content.
pub const EMPTY_CONTENT_PLACEHOLDER: &str = "_No content yet. Start writing..._";

static BLOCK_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]{0,3}(?:#{1,6}[ \t]+|>[ \t]?|[-*+][ \t]+|\d+[.)][ \t]+)")
        .expect("valid block marker regex")
});
static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)[^)]*\)").expect("valid image regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"));
static EMPHASIS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*{1,3}|~~|`+|\b_{1,3}|_{1,3}\b").expect("valid emphasis regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Converts raw entry content into render-ready markup.
pub trait MarkupRenderer {
    fn render(&self, source: &str) -> String;
}

/// Renders Markdown as escaped plain text with paragraph breaks preserved.
///
/// Used by terminal front ends; rich front ends plug in their own renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl MarkupRenderer for PlainTextRenderer {
    fn render(&self, source: &str) -> String {
        let source = if source.trim().is_empty() {
            EMPTY_CONTENT_PLACEHOLDER
        } else {
            source
        };
        source
            .split("\n\n")
            .map(plain_text)
            .filter(|paragraph| !paragraph.is_empty())
            .map(|paragraph| escape_html(&paragraph))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Compact projection of Markdown content for list displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownPreview {
    /// Plain text, whitespace collapsed, capped at the requested length.
    /// `None` when nothing readable remains.
    pub text: Option<String>,
    /// Target of the first image, if any.
    pub image: Option<String>,
}

/// Derives a list preview holding at most `max_chars` characters of text.
pub fn derive_markdown_preview(content: &str, max_chars: usize) -> MarkdownPreview {
    let image = IMAGE_RE
        .captures(content)
        .and_then(|caps| caps.get(2))
        .map(|path| path.as_str().to_string());
    let text = Some(plain_text(content))
        .filter(|text| !text.is_empty())
        .map(|text| text.chars().take(max_chars).collect());
    MarkdownPreview { text, image }
}

/// Side-panel statistics for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    pub created_at: i64,
    pub updated_at: i64,
    pub word_count: usize,
}

impl DocumentStats {
    pub fn of(entry: &Entry) -> Self {
        Self {
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            word_count: entry.content.split_whitespace().count(),
        }
    }
}

/// Drops Markdown syntax from `markdown`; images keep their alt text and
/// links keep their label.
fn plain_text(markdown: &str) -> String {
    let text = BLOCK_MARKER_RE.replace_all(markdown, "");
    let text = IMAGE_RE.replace_all(&text, "$1");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = EMPHASIS_RE.replace_all(&text, "");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
