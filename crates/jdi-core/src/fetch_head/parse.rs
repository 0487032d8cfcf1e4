//! Parse collected response header lines into `HeadResult`.

use super::HeadResult;

/// libcurl hands us the headers of every response in a redirect chain; a new
/// status line starts a new block and only the last block describes the
/// resource we will actually fetch.
pub(crate) fn parse_headers(lines: &[String]) -> HeadResult {
    let mut out = HeadResult::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            out = HeadResult::default();
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            out.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            out.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("content-disposition") {
            out.content_disposition = Some(value.to_string());
        }
    }

    out
}
