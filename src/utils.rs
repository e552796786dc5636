use regex::Regex;
use std::sync::OnceLock;
use unicode_width::UnicodeWidthChar;

/// Safely truncate a string for display, never splitting a multi-byte character
///
/// The output's display width does not exceed `max_width`; an ellipsis is
/// appended when anything was cut.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str("...");
    result
}

/// Keep at most `max_bytes` bytes of `s`, cutting on a character boundary.
pub fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn strip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static slug pattern"))
}

fn dash_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-\s]+").expect("static slug pattern"))
}

/// Convert text to a URL/key-safe slug.
///
/// Non-ASCII characters are dropped, anything that is not a word character,
/// whitespace or hyphen is removed, and runs of hyphens/whitespace collapse
/// to a single hyphen.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.chars().filter(char::is_ascii).collect();
    let stripped = strip_pattern().replace_all(&ascii, "");
    let lowered = stripped.trim().to_lowercase();
    dash_pattern().replace_all(&lowered, "-").into_owned()
}
