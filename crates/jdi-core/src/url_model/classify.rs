//! Routing of submitted URLs: plain file, single media item, or playlist.

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// Anything fetched over plain HTTP(S) with the chunked engine.
    PlainFile,
    /// A single YouTube-like media page.
    Media,
    /// A YouTube playlist; expanded into items, never downloaded itself.
    Playlist,
}

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "music.youtube.com"];

/// Classifies `url`. Unparseable input is returned as `Err` with a reason.
pub fn classify_url(url: &str) -> Result<UrlKind, String> {
    let parsed = Url::parse(url.trim()).map_err(|e| format!("not a valid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }
    if parsed.host_str().is_none() {
        return Err("URL has no host".to_string());
    }
    if is_playlist(&parsed) {
        Ok(UrlKind::Playlist)
    } else if is_youtube(&parsed) {
        Ok(UrlKind::Media)
    } else {
        Ok(UrlKind::PlainFile)
    }
}

/// True for `youtube.com/watch?v=`, `/v/`, `/shorts/`, `youtu.be/` and
/// `music.youtube.com` item links.
pub fn is_youtube_url(url: &str) -> bool {
    Url::parse(url).map(|u| is_youtube(&u)).unwrap_or(false)
}

/// True when a YouTube URL carries a `list=` parameter or is a `/playlist` page.
pub fn is_playlist_url(url: &str) -> bool {
    Url::parse(url).map(|u| is_playlist(&u)).unwrap_or(false)
}

fn host(u: &Url) -> String {
    u.host_str().unwrap_or_default().to_ascii_lowercase()
}

fn is_youtube(u: &Url) -> bool {
    let host = host(u);
    if host == "youtu.be" {
        return u.path_segments().and_then(|mut s| s.next()).is_some_and(is_video_id);
    }
    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return false;
    }
    let mut segments = u.path_segments().into_iter().flatten();
    match (segments.next(), segments.next()) {
        (Some("watch"), _) => query_value(u, "v").is_some_and(|v| is_video_id(&v)),
        (Some("v" | "shorts"), Some(id)) => is_video_id(id),
        _ => false,
    }
}

fn is_playlist(u: &Url) -> bool {
    let host = host(u);
    if host != "youtu.be" && !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return false;
    }
    u.path() == "/playlist" || query_value(u, "list").is_some_and(|v| !v.is_empty())
}

fn query_value(u: &Url, key: &str) -> Option<String> {
    u.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
}

fn is_video_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
