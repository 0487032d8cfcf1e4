//! URL classification and local filename derivation.

mod classify;
mod content_disposition;
mod path;
mod sanitize;

pub use classify::{classify_url, is_playlist_url, is_youtube_url, UrlKind};
pub use content_disposition::parse_content_disposition_filename;
pub use path::filename_from_url_path;
pub use sanitize::{sanitize_filename, sanitize_title, MAX_TITLE_CHARS};

/// Used when neither the header nor the URL path yields a name.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Local filename for a plain-file download.
///
/// `Content-Disposition` wins over the last URL path segment; the result is
/// sanitized and falls back to `download.bin`.
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    let raw = content_disposition
        .and_then(parse_content_disposition_filename)
        .or_else(|| filename_from_url_path(url));

    match raw.map(|r| sanitize_filename(&r)) {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}
