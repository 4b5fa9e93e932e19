//! Match-centred excerpts for search results.
//!
//! All offsets are in characters, not bytes, so multi-byte text is never
//! split inside a code point.

/// Characters of context kept on each side of the match.
pub const CONTEXT_CHARS: usize = 50;
/// Length of the plain excerpt used when the query does not occur.
pub const MAX_EXCERPT_CHARS: usize = 150;

const ELLIPSIS: &str = "...";

/// Char index of the first case-insensitive occurrence of `needle`.
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay: Vec<char> = haystack.chars().collect();
    let pat: Vec<char> = needle.chars().collect();
    if pat.is_empty() || pat.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - pat.len()).find(|&start| {
        pat.iter()
            .zip(&hay[start..])
            .all(|(p, h)| chars_eq_ignore_case(*p, *h))
    })
}

pub fn contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    find_case_insensitive(haystack, needle).is_some()
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Excerpt of `text` around the first occurrence of `query`.
///
/// Keeps [`CONTEXT_CHARS`] on each side of the match, clamped to the text.
/// A leading `...` is added when the window starts after the beginning of
/// the text, a trailing one when it ends before the end. Without a match the
/// text is truncated to [`MAX_EXCERPT_CHARS`].
pub fn generate_snippet(text: &str, query: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let query = query.trim();

    let Some(pos) = find_case_insensitive(text, query) else {
        return truncate(&chars);
    };

    let match_len = query.chars().count();
    let start = pos.saturating_sub(CONTEXT_CHARS);
    let end = (pos + match_len + CONTEXT_CHARS).min(chars.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.extend(&chars[start..end]);
    if end < chars.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

fn truncate(chars: &[char]) -> String {
    if chars.len() <= MAX_EXCERPT_CHARS {
        return chars.iter().collect();
    }
    let mut out: String = chars[..MAX_EXCERPT_CHARS].iter().collect();
    out.push_str(ELLIPSIS);
    out
}
