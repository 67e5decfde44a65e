//! Small shared helpers.

/// Truncate a string to at most `max_chars` characters, respecting UTF-8
/// character boundaries (never splitting a multi-byte codepoint).
#[must_use]
pub fn truncate_to_boundary(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Escape a string for safe interpolation into platform scripting calls:
/// backslash, double-quote, and newline at minimum.
#[must_use]
pub fn escape_for_scripting(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Escape `%` and `_`, SQLite's `LIKE` wildcard metacharacters, using `\` as
/// the escape character. Used by `search_messages`.
#[must_use]
pub fn escape_like_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_utf8_boundaries() {
        let s = "h\u{e9}llo world"; // contains a multi-byte é
        let t = truncate_to_boundary(s, 3);
        assert_eq!(t, "h\u{e9}l");
    }

    #[test]
    fn truncate_shorter_than_bound_is_noop() {
        assert_eq!(truncate_to_boundary("hi", 10), "hi");
    }

    #[test]
    fn escape_for_scripting_handles_all_metacharacters() {
        let escaped = escape_for_scripting("line1\\\"line2\"\nline3");
        assert_eq!(escaped, "line1\\\\\\\"line2\\\"\\nline3");
    }

    #[test]
    fn escape_like_pattern_escapes_wildcards() {
        assert_eq!(escape_like_pattern("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like_pattern("plain"), "plain");
    }
}
