//! Filename cleaning for downloaded files and media titles.

/// Characters rejected by at least one common filesystem.
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest title kept when naming media outputs, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Byte ceiling for any single path component (Linux NAME_MAX).
const NAME_MAX: usize = 255;

/// Sanitizes a server-supplied filename.
///
/// Reserved and control characters become `_` (runs collapsed), leading and
/// trailing dots/spaces/underscores are trimmed, and the result is cut to
/// NAME_MAX bytes on a char boundary.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let c = if c.is_control() || RESERVED.contains(&c) || c == '\t' {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.' || c == '_');
    truncate_bytes(trimmed, NAME_MAX).to_string()
}

/// Cleans a media title for use as a file stem: reserved and control
/// characters are dropped, whitespace is trimmed and the result is capped at
/// `MAX_TITLE_CHARS` characters. Returns `None` when nothing usable remains.
pub fn sanitize_title(title: &str) -> Option<String> {
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && !RESERVED.contains(c))
        .take(MAX_TITLE_CHARS)
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim_end();
    let cleaned = truncate_bytes(cleaned, NAME_MAX - 16);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}
