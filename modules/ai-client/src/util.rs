/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip a surrounding markdown code fence (with or without a language tag)
/// from a model response.
pub fn strip_code_blocks(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag line ("json", "JSON", ...), if any.
    let body = match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains(char::is_whitespace) => body,
        _ => rest,
    };

    body.trim_end().trim_end_matches("```").trim()
}
