//! Plain-text helpers shared by request sanitization and rendering

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex")
});

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Remove markup, including the contents of `<script>`/`<style>` blocks
pub fn strip_tags(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(html, "");
    TAG_RE.replace_all(&without_blocks, "").trim().to_string()
}

/// Single-line plain text: markup stripped, whitespace runs collapsed, trimmed
pub fn sanitize_text(raw: &str) -> String {
    strip_tags(raw).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-folded text for substring search
///
/// Full Unicode lowercasing, applied to both the stored search columns and
/// the needle. SQLite's own `LIKE`/`lower()` only fold ASCII.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// First `words` words of `text`, with `…` appended when anything was cut
pub fn trim_words(text: &str, words: usize) -> String {
    let mut parts = text.split_whitespace();
    let kept: Vec<&str> = parts.by_ref().take(words).collect();

    let mut trimmed = kept.join(" ");
    if parts.next().is_some() {
        trimmed.push('…');
    }
    trimmed
}

/// Explicit excerpt if set, otherwise the first `words` words of the stripped description
pub fn excerpt_or_summary(excerpt: &str, description: &str, words: usize) -> String {
    if !excerpt.is_empty() {
        return excerpt.to_string();
    }
    trim_words(&strip_tags(description), words)
}

/// Wrap plain-text paragraphs in `<p>` for display
///
/// Blank lines separate paragraphs and single newlines become `<br />`.
/// Text that already starts with markup is returned trimmed but untouched.
pub fn paragraphs(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() || text.starts_with('<') {
        return text.to_string();
    }

    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| format!("<p>{}</p>", block.replace('\n', "<br />\n")))
        .collect::<Vec<_>>()
        .join("\n")
}
