//! HTTP HEAD / metadata probing.
//!
//! Uses libcurl to learn `Content-Length`, `Accept-Ranges: bytes` and the
//! `Content-Disposition` filename hint before a download is planned, and to
//! run the cheap reachability check the orchestrator performs on submission.

mod parse;

use std::collections::HashMap;
use std::str;
use std::time::Duration;

use crate::retry::TransferError;

pub(crate) use parse::parse_headers;

/// Key headers of the final response after redirects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `Content-Disposition` value if present (filename hint).
    pub content_disposition: Option<String>,
}

impl HeadResult {
    /// Size usable for range planning: known, non-zero, and ranges advertised.
    pub fn rangeable_size(&self) -> Option<u64> {
        match self.content_length {
            Some(n) if n > 0 && self.accept_ranges => Some(n),
            _ => None,
        }
    }
}

/// Builds a curl header list from `custom_headers` ("Name: value").
pub(crate) fn header_list(custom_headers: &HashMap<String, String>) -> Result<Option<curl::easy::List>, curl::Error> {
    if custom_headers.is_empty() {
        return Ok(None);
    }
    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    Ok(Some(list))
}

/// Performs a HEAD request (following redirects) and returns parsed metadata.
/// Blocks the calling thread.
pub fn probe(url: &str, custom_headers: &HashMap<String, String>) -> Result<HeadResult, TransferError> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;
    if let Some(list) = header_list(custom_headers)? {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }
    Ok(parse_headers(&lines))
}

/// Cheap existence check: HEAD, and for servers that refuse HEAD (405/501)
/// a one-byte ranged GET.
pub fn check_reachable(url: &str, custom_headers: &HashMap<String, String>) -> Result<(), TransferError> {
    match probe(url, custom_headers) {
        Ok(_) => Ok(()),
        Err(TransferError::Http(405 | 501)) => probe_first_byte(url, custom_headers),
        Err(e) => Err(e),
    }
}

fn probe_first_byte(url: &str, custom_headers: &HashMap<String, String>) -> Result<(), TransferError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;
    easy.range("0-0")?;
    if let Some(list) = header_list(custom_headers)? {
        easy.http_headers(list)?;
    }
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }
    Ok(())
}
