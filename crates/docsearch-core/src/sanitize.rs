//! Cleaning of untrusted document text, metadata and queries.
//!
//! `sanitize_content` runs four steps in a fixed order: dangerous blocks are
//! cut out first, then control characters, then whitespace, and escaping goes
//! last so no tag boundary can survive as escaped-but-intact markup.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::types::Metadata;

/// Metadata keys that survive `sanitize_metadata`.
pub const ALLOWED_METADATA_KEYS: [&str; 6] = ["source", "title", "author", "date", "type", "tags"];

/// Block elements removed together with everything up to their closing tag.
pub const DANGEROUS_TAGS: [&str; 6] = ["script", "style", "iframe", "object", "embed", "form"];

pub const MAX_QUERY_CHARS: usize = 1000;

/// Entities emitted by `escape_html`; an `&` already starting one is kept as is.
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#x27;"];

static BLOCK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DANGEROUS_TAGS
        .iter()
        .map(|tag| {
            // non-greedy up to the first closing tag of the same name
            Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}\s*>")).expect("static block pattern")
        })
        .collect()
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

static QUERY_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?-]").expect("static query pattern"));

pub fn sanitize_content(text: &str) -> String {
    let without_blocks = strip_dangerous_blocks(text);
    let printable: String = without_blocks
        .chars()
        .filter(|&c| c >= ' ' || c == '\n' || c == '\t')
        .collect();
    let collapsed = WHITESPACE.replace_all(&printable, " ");
    escape_html(collapsed.trim())
}

/// Keep allow-listed keys only. Strings are sanitized, booleans and numbers
/// pass through, anything else is rendered as JSON text and sanitized.
pub fn sanitize_metadata(metadata: &Metadata) -> Metadata {
    let mut safe = Metadata::new();
    for (key, value) in metadata {
        if !ALLOWED_METADATA_KEYS.contains(&key.as_str()) {
            continue;
        }
        let value = match value {
            Value::String(s) => Value::String(sanitize_content(s)),
            Value::Bool(_) | Value::Number(_) => value.clone(),
            other => Value::String(sanitize_content(&other.to_string())),
        };
        safe.insert(key.clone(), value);
    }
    safe
}

/// Drop everything but word characters, whitespace and `. , ! ? -`, cap the
/// length at [`MAX_QUERY_CHARS`] characters and trim.
pub fn sanitize_query(query: &str) -> String {
    let filtered = QUERY_DISALLOWED.replace_all(query, "");
    let truncated: String = filtered.chars().take(MAX_QUERY_CHARS).collect();
    truncated.trim().to_string()
}

fn strip_dangerous_blocks(text: &str) -> String {
    let mut current = text.to_string();
    // removing one block can splice together the halves of another
    loop {
        let mut changed = false;
        for pattern in BLOCK_PATTERNS.iter() {
            if pattern.is_match(&current) {
                current = pattern.replace_all(&current, "").into_owned();
                changed = true;
            }
        }
        if !changed {
            return current;
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' if ENTITIES.iter().any(|e| text[i..].starts_with(e)) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
