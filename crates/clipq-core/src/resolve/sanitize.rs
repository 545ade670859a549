//! Filesystem-safe output basename sanitization.

/// Sanitizes a candidate output basename.
///
/// - Replaces `< > : " / \ | ? *`, NUL, and control characters with `_`
/// - Replaces whitespace with `_`
/// - Collapses a run of separators (`_`, `-`) to its first character
/// - Trims leading/trailing spaces, dots, underscores, and dashes
/// - Limits length to 255 bytes (NAME_MAX)
pub fn sanitize_basename(name: &str) -> String {
    const NAME_MAX: usize = 255;
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let mut out = String::with_capacity(name.len());
    let mut prev_separator = false;

    for c in name.chars() {
        let replaced = if INVALID.contains(&c) || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };

        let separator = replaced == '_' || replaced == '-';
        if separator && prev_separator {
            continue;
        }
        out.push(replaced);
        prev_separator = separator;
    }

    let trimmed = out.trim_matches(|c| matches!(c, ' ' | '.' | '_' | '-'));

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}
