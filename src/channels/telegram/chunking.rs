//! Split long text into Telegram-sized messages
//!
//! Paragraphs are kept together where they fit. A paragraph longer than the
//! limit is broken at the last newline or space before it, or hard-split on a
//! character boundary when there is none.

/// Telegram's message limit is 4096; leave room for formatting
pub const DEFAULT_LIMIT: usize = 4000;

/// Split `text` into chunks of at most `limit` bytes
///
/// A `limit` of zero means [`DEFAULT_LIMIT`]. Chunks are trimmed and never
/// empty.
#[must_use]
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let joined_len = if current.is_empty() {
            paragraph.len()
        } else {
            current.len() + 2 + paragraph.len()
        };

        if joined_len <= limit {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if paragraph.len() <= limit {
            current.push_str(paragraph);
        } else {
            chunks.extend(split_long(paragraph, limit));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Break one oversized paragraph
fn split_long(mut text: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    while text.len() > limit {
        let at = split_point(text, limit);
        let (head, tail) = text.split_at(at);
        let head = head.trim();
        if !head.is_empty() {
            pieces.push(head.to_string());
        }
        text = tail.trim_start();
    }
    if !text.is_empty() {
        pieces.push(text.to_string());
    }
    pieces
}

/// Byte index to split at: after the last newline or space within `limit`
fn split_point(text: &str, limit: usize) -> usize {
    let mut boundary = limit;
    while !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    if boundary == 0 {
        return text.chars().next().map_or(text.len(), char::len_utf8);
    }
    let window = &text[..boundary];

    window
        .rfind('\n')
        .or_else(|| window.rfind(' '))
        .filter(|&i| i > 0)
        .map_or(boundary, |i| i + 1)
}
