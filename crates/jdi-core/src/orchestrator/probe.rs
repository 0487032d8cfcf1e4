//! Pre-admission URL checks.

use std::collections::HashMap;

use crate::fetch_head;
use crate::worker::JobKind;

pub trait ReachabilityProbe: Send + Sync {
    /// `Err(reason)` when the URL should be rejected. `headers` are the ones
    /// the job itself will send (e.g. `Cookie`).
    fn check(&self, url: &str, kind: JobKind, headers: &HashMap<String, String>) -> Result<(), String>;
}

/// HEAD request for plain files; media URLs were already shape-checked by
/// classification.
#[derive(Debug, Default)]
pub struct HeadProbe;

impl ReachabilityProbe for HeadProbe {
    fn check(&self, url: &str, kind: JobKind, headers: &HashMap<String, String>) -> Result<(), String> {
        match kind {
            JobKind::PlainFile => fetch_head::check_reachable(url, headers).map_err(|e| e.to_string()),
            JobKind::YouTubeCombined | JobKind::YouTubeAudioOnly => Ok(()),
        }
    }
}

/// Accepts every URL.
#[derive(Debug, Default)]
pub struct NoProbe;

impl ReachabilityProbe for NoProbe {
    fn check(&self, _url: &str, _kind: JobKind, _headers: &HashMap<String, String>) -> Result<(), String> {
        Ok(())
    }
}
