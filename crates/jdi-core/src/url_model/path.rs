//! Filename hint from the URL path.

use super::content_disposition::percent_decode;

/// Last non-empty path segment of `url`, percent-decoded.
///
/// `None` when the URL does not parse or has no usable segment.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(segment);
    if decoded.is_empty() || decoded == "." || decoded == ".." {
        return None;
    }
    Some(decoded)
}
