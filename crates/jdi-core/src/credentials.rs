//! Optional per-host cookies for authenticated downloads.
//!
//! Credential lookups never fail a job: callers log the `CredentialError`,
//! emit a status note, and carry on without cookies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("cookie store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read cookies from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of cookies for a URL (name -> value).
pub trait CredentialProvider: Send + Sync {
    fn cookies_for(&self, url: &str) -> Result<HashMap<String, String>, CredentialError>;

    /// A Netscape-format cookie file the media extractor can read directly,
    /// if this provider is backed by one.
    fn cookie_file(&self) -> Option<&Path> {
        None
    }
}

/// Provider that never has cookies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn cookies_for(&self, _url: &str) -> Result<HashMap<String, String>, CredentialError> {
        Ok(HashMap::new())
    }
}

/// Reads a Netscape `cookies.txt` export on every lookup.
#[derive(Debug, Clone)]
pub struct CookieFileProvider {
    path: PathBuf,
}

impl CookieFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for CookieFileProvider {
    fn cookies_for(&self, url: &str) -> Result<HashMap<String, String>, CredentialError> {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .ok_or_else(|| CredentialError::Unavailable(format!("no host in {url}")))?;
        let text = std::fs::read_to_string(&self.path).map_err(|source| CredentialError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(parse_netscape_cookies(&text, &host))
    }

    fn cookie_file(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Cookies in a Netscape cookie file whose domain matches `host`.
/// Expiry is not checked; servers ignore stale cookies anyway.
fn parse_netscape_cookies(text: &str, host: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in text.lines() {
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        let domain = fields[0].trim_start_matches('.').to_ascii_lowercase();
        let matches = host == domain || host.ends_with(&format!(".{domain}"));
        if matches {
            out.insert(fields[5].to_string(), fields[6].trim_end().to_string());
        }
    }
    out
}

/// `Cookie:` header value for a set of cookies (stable order).
pub fn cookie_header(cookies: &HashMap<String, String>) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    let mut pairs: Vec<_> = cookies.iter().collect();
    pairs.sort();
    Some(
        pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Netscape HTTP Cookie File\n\
.example.com\tTRUE\t/\tTRUE\t0\tsid\tabc123\n\
#HttpOnly_.example.com\tTRUE\t/\tTRUE\t0\ttoken\txyz\n\
other.org\tFALSE\t/\tFALSE\t0\tnope\t1\n\
malformed line\n";

    #[test]
    fn netscape_domain_matching() {
        let c = parse_netscape_cookies(SAMPLE, "cdn.example.com");
        assert_eq!(c.get("sid").map(String::as_str), Some("abc123"));
        assert_eq!(c.get("token").map(String::as_str), Some("xyz"));
        assert!(!c.contains_key("nope"));
        assert!(parse_netscape_cookies(SAMPLE, "notexample.com").is_empty());
    }

    #[test]
    fn header_is_sorted() {
        let mut c = HashMap::new();
        c.insert("b".to_string(), "2".to_string());
        c.insert("a".to_string(), "1".to_string());
        assert_eq!(cookie_header(&c).as_deref(), Some("a=1; b=2"));
        assert_eq!(cookie_header(&HashMap::new()), None);
    }

    #[test]
    fn missing_file_is_soft_error() {
        let p = CookieFileProvider::new("/nonexistent/cookies.txt");
        assert!(matches!(
            p.cookies_for("https://example.com/"),
            Err(CredentialError::Read { .. })
        ));
        assert!(NoCredentials.cookies_for("https://example.com/").unwrap().is_empty());
    }
}
