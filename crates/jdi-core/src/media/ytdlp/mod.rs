//! `MediaExtractor` backed by the `yt-dlp` executable.

mod json;
mod progress;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::Span;

use super::{MediaExtractor, MediaFormat, MediaInfo};
use crate::control::CancelSignal;
use crate::error::DownloadError;
use crate::progress::{ProgressEvent, ProgressSender, RateLimiter, StreamKind};
use crate::subprocess::{run_capture, run_watched, Pipe};

use json::{InfoJson, PlaylistJson};
use progress::{parse_progress_line, LineProgress, TEMPLATE};

const TOOL: &str = "yt-dlp";

#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    cookie_file: Option<PathBuf>,
    grace: Duration,
    progress_interval: Duration,
    span: Span,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookie_file: None,
            grace: Duration::from_millis(500),
            progress_interval: Duration::from_millis(50),
            span: Span::current(),
        }
    }

    pub fn with_cookie_file(mut self, path: Option<PathBuf>) -> Self {
        self.cookie_file = path;
        self
    }

    /// How long a cancelled yt-dlp gets to exit after SIGTERM.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--no-warnings", "--no-color"]);
        if let Some(cookies) = &self.cookie_file {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd
    }
}

impl MediaExtractor for YtDlp {
    fn resolve_formats(&self, url: &str, cancel: &CancelSignal) -> Result<MediaInfo, DownloadError> {
        let _g = self.span.enter();
        let mut cmd = self.command();
        cmd.args(["-J", "--no-playlist", "--"]).arg(url);
        let out = run_capture(TOOL, cmd, cancel, self.grace)?;
        let info: InfoJson = serde_json::from_str(out.trim())?;
        let info = MediaInfo::from(info);
        tracing::debug!(url, title = %info.title, formats = info.formats.len(), "resolved formats");
        Ok(info)
    }

    fn expand_playlist(&self, url: &str, cancel: &CancelSignal) -> Result<Vec<String>, DownloadError> {
        let _g = self.span.enter();
        let mut cmd = self.command();
        cmd.args(["--flat-playlist", "-J", "--ignore-errors", "--"]).arg(url);
        let out = run_capture(TOOL, cmd, cancel, self.grace)?;
        let playlist: PlaylistJson = serde_json::from_str(out.trim())?;
        let items = playlist.item_urls();
        tracing::debug!(url, items = items.len(), "expanded playlist");
        Ok(items)
    }

    fn fetch_stream(
        &self,
        url: &str,
        format: &MediaFormat,
        dest: &Path,
        stream: StreamKind,
        progress: &ProgressSender,
        cancel: &CancelSignal,
    ) -> Result<(), DownloadError> {
        let _g = self.span.enter();
        let mut cmd = self.command();
        cmd.args(["-f", format.format_id.as_str(), "--force-overwrites", "--no-part", "--newline"])
            .args(["--progress-template", TEMPLATE])
            .arg("-o")
            .arg(dest)
            .arg("--")
            .arg(url);

        let limiter = RateLimiter::new(self.progress_interval);
        let mut last = None;
        let exit = run_watched(TOOL, cmd, cancel, self.grace, |pipe, line| {
            if pipe != Pipe::Stdout {
                return;
            }
            if let Some(p) = parse_progress_line(line) {
                last = Some(p);
                if limiter.try_acquire() {
                    progress.send(progress_event(&p, stream));
                }
            }
        })?;
        exit.check(TOOL)?;

        if let Some(p) = last {
            let total = p.total.max(p.done);
            let end = LineProgress { done: total, total, rate: p.rate };
            progress.send(progress_event(&end, stream));
        }
        tracing::debug!(url, format = %format.format_id, %stream, "stream fetched");
        Ok(())
    }
}

fn progress_event(p: &LineProgress, stream: StreamKind) -> ProgressEvent {
    let total = p.total.max(p.done);
    let percent = if total == 0 {
        0.0
    } else {
        p.done as f64 / total as f64 * 100.0
    };
    ProgressEvent::Progress {
        stream,
        percent,
        bytes_done: p.done,
        bytes_total: total,
        rate: p.rate,
    }
}
