//! Turning user-supplied URLs into queued jobs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::record::{JobRecord, JobState};
use super::Shared;
use crate::credentials::cookie_header;
use crate::pipeline::MediaRequest;
use crate::progress::ProgressEvent;
use crate::url_model::{classify_url, UrlKind};
use crate::worker::JobKind;

/// Reachability checks run at most this many at a time.
const VALIDATION_FANOUT: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    /// Overrides the configured download directory.
    pub destination: Option<PathBuf>,
    /// Media URLs download a single audio stream instead of video + audio.
    pub audio_only: bool,
    /// Overrides the configured media preferences.
    pub media: Option<MediaRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidUrl {
    pub url: String,
    pub reason: String,
}

/// Outcome of one `submit`: ids of queued jobs, in submission order, and the
/// URLs that were turned away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    pub accepted: Vec<u64>,
    pub invalid: Vec<InvalidUrl>,
}

struct Candidate {
    url: String,
    kind: JobKind,
    headers: HashMap<String, String>,
    cookie_file: Option<PathBuf>,
    /// Shown to the user once the job is queued.
    note: Option<String>,
}

impl Candidate {
    fn new(url: String, kind: JobKind) -> Self {
        Self {
            url,
            kind,
            headers: HashMap::new(),
            cookie_file: None,
            note: None,
        }
    }
}

pub(super) fn admit<S: AsRef<str>>(shared: &Arc<Shared>, urls: &[S], request: &SubmitRequest) -> SubmitReport {
    let _g = shared.span.enter();
    let mut report = SubmitReport::default();

    // Credentials first: the reachability check must send the same cookies
    // the download will.
    let mut candidates = expand(shared, urls, request, &mut report);
    for c in &mut candidates {
        attach_credentials(shared, c);
    }
    let candidates = if shared.validate_urls {
        validate(shared, candidates, &mut report)
    } else {
        candidates
    };

    let destination = request.destination.clone().unwrap_or_else(|| shared.download_dir.clone());
    let mut notes = Vec::with_capacity(candidates.len());
    {
        let mut guard = shared.book.lock().unwrap();
        let book = &mut *guard;
        let media = request.media.clone().unwrap_or_else(|| book.settings.media.clone());
        for candidate in candidates {
            let id = book.next_id;
            book.next_id += 1;
            tracing::info!(job = id, kind = ?candidate.kind, url = %candidate.url, "job queued");
            book.jobs.insert(
                id,
                JobRecord {
                    id,
                    kind: candidate.kind,
                    source_url: candidate.url,
                    destination_folder: destination.clone(),
                    media: media.clone(),
                    headers: candidate.headers,
                    cookie_file: candidate.cookie_file,
                    state: JobState::Pending,
                    worker: None,
                    cancel_requested: false,
                    title: None,
                    result_paths: Vec::new(),
                    error: None,
                },
            );
            notes.push(candidate.note);
            report.accepted.push(id);
        }
    }

    // The records are not in the queue yet, so no worker event can reach the
    // sink ahead of "Queued".
    for (id, note) in report.accepted.iter().zip(notes) {
        shared.sink.on_event(*id, &ProgressEvent::status("Queued"));
        if let Some(note) = note {
            shared.sink.on_event(*id, &ProgressEvent::status(note));
        }
    }
    let mut dropped = Vec::new();
    {
        let mut guard = shared.book.lock().unwrap();
        let book = &mut *guard;
        for id in &report.accepted {
            // A job cancelled in between is already settled.
            let Some(rec) = book.jobs.get_mut(id).filter(|r| r.state == JobState::Pending) else {
                continue;
            };
            if shared.stop.is_cancelled() {
                rec.state = JobState::Cancelled;
                dropped.push(*id);
            } else {
                book.pending.push_back(*id);
            }
        }
    }
    for id in dropped {
        shared.sink.on_event(id, &ProgressEvent::Cancelled);
    }
    for bad in &report.invalid {
        tracing::warn!(url = %bad.url, "rejected: {}", bad.reason);
    }
    report
}

/// Classifies each URL; playlists become one candidate per item.
fn expand<S: AsRef<str>>(
    shared: &Shared,
    urls: &[S],
    request: &SubmitRequest,
    report: &mut SubmitReport,
) -> Vec<Candidate> {
    let media_kind = if request.audio_only {
        JobKind::YouTubeAudioOnly
    } else {
        JobKind::YouTubeCombined
    };
    let mut out = Vec::new();
    for raw in urls {
        let url = raw.as_ref().trim();
        if url.is_empty() {
            continue;
        }
        let reject = |reason: String| InvalidUrl {
            url: url.to_string(),
            reason,
        };
        match classify_url(url) {
            Err(reason) => report.invalid.push(reject(reason)),
            Ok(UrlKind::PlainFile) => out.push(Candidate::new(url.to_string(), JobKind::PlainFile)),
            Ok(UrlKind::Media) => out.push(Candidate::new(url.to_string(), media_kind)),
            Ok(UrlKind::Playlist) => match shared.extractor.expand_playlist(url, &shared.stop) {
                Err(e) => report.invalid.push(reject(format!("could not expand playlist: {e}"))),
                Ok(items) if items.is_empty() => report.invalid.push(reject("playlist is empty".into())),
                Ok(items) => {
                    tracing::info!(url, items = items.len(), "playlist expanded");
                    out.extend(items.into_iter().map(|url| Candidate::new(url, media_kind)));
                }
            },
        }
    }
    out
}

/// Probes candidates concurrently; order of the survivors is preserved.
fn validate(shared: &Shared, candidates: Vec<Candidate>, report: &mut SubmitReport) -> Vec<Candidate> {
    let mut verdicts: Vec<Result<(), String>> = Vec::with_capacity(candidates.len());
    for batch in candidates.chunks(VALIDATION_FANOUT) {
        std::thread::scope(|s| {
            let handles: Vec<_> = batch
                .iter()
                .map(|c| s.spawn(move || shared.probe.check(&c.url, c.kind, &c.headers)))
                .collect();
            for h in handles {
                verdicts.push(h.join().unwrap_or_else(|_| Err("validation panicked".into())));
            }
        });
    }

    candidates
        .into_iter()
        .zip(verdicts)
        .filter_map(|(c, verdict)| match verdict {
            Ok(()) => Some(c),
            Err(reason) => {
                report.invalid.push(InvalidUrl { url: c.url, reason });
                None
            }
        })
        .collect()
}

/// Cookie header for plain files, cookie file for the extractor. Lookup
/// failures never reject a job; they come back as a note for the user.
fn attach_credentials(shared: &Shared, c: &mut Candidate) {
    match c.kind {
        JobKind::PlainFile => match shared.credentials.cookies_for(&c.url) {
            Ok(cookies) => {
                if let Some(value) = cookie_header(&cookies) {
                    c.headers.insert("Cookie".to_string(), value);
                }
            }
            Err(e) => {
                tracing::warn!(url = %c.url, "continuing without cookies: {e}");
                c.note = Some(format!("Continuing without cookies: {e}"));
            }
        },
        JobKind::YouTubeCombined | JobKind::YouTubeAudioOnly => {
            c.cookie_file = shared.credentials.cookie_file().map(PathBuf::from);
        }
    }
}
