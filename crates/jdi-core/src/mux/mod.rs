//! Stream-copy merge of a video and an audio file with ffmpeg.

mod parse;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::Span;

use crate::control::CancelSignal;
use crate::error::DownloadError;
use crate::progress::{ProgressEvent, ProgressSender, RateLimiter, StreamKind};
use crate::subprocess::{run_watched, Pipe};

use parse::MuxProgress;

const TOOL: &str = "ffmpeg";

#[derive(Debug, Clone)]
pub struct Muxer {
    program: PathBuf,
    grace: Duration,
    progress_interval: Duration,
    span: Span,
}

impl Muxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            grace: Duration::from_millis(500),
            progress_interval: Duration::from_millis(50),
            span: Span::current(),
        }
    }

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

    /// Merges `video` and `audio` into `output` (container chosen by
    /// `container_ext`, since temp names carry no usable extension).
    ///
    /// Emits `Progress(Muxing, ..)` from ffmpeg's stderr. On cancel the
    /// process gets SIGTERM, then a kill after the grace period. Cleaning up
    /// `output` on failure is the caller's job.
    pub fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        container_ext: &str,
        progress: &ProgressSender,
        cancel: &CancelSignal,
    ) -> Result<(), DownloadError> {
        let _g = self.span.enter();
        let mut cmd = Command::new(&self.program);
        cmd.args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c", "copy", "-map", "0:v:0", "-map", "1:a:0", "-f", muxer_format(container_ext)])
            .arg(output);

        let limiter = RateLimiter::new(self.progress_interval);
        let mut state = MuxProgress::default();
        let exit = run_watched(TOOL, cmd, cancel, self.grace, |pipe, line| {
            if pipe != Pipe::Stderr {
                return;
            }
            if let Some(percent) = state.feed(line) {
                if limiter.try_acquire() {
                    progress.send(muxing_event(percent));
                }
            }
        })?;

        if !exit.success {
            tracing::warn!(code = ?exit.code, "ffmpeg failed");
            return Err(DownloadError::Mux {
                code: exit.code,
                stderr: exit.stderr_tail,
            });
        }
        progress.send(muxing_event(100.0));
        tracing::debug!(output = %output.display(), "mux finished");
        Ok(())
    }
}

fn muxing_event(percent: f64) -> ProgressEvent {
    ProgressEvent::Progress {
        stream: StreamKind::Muxing,
        percent,
        bytes_done: 0,
        bytes_total: 0,
        rate: 0.0,
    }
}

/// ffmpeg `-f` name for a file extension.
fn muxer_format(ext: &str) -> &'static str {
    match ext {
        "mp4" | "m4a" => "mp4",
        "webm" => "webm",
        _ => "matroska",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_names() {
        assert_eq!(muxer_format("mp4"), "mp4");
        assert_eq!(muxer_format("mkv"), "matroska");
    }

    #[test]
    fn missing_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = crate::progress::progress_channel();
        let m = Muxer::new(dir.path().join("no-ffmpeg-here"));
        let err = m
            .mux(
                &dir.path().join("v"),
                &dir.path().join("a"),
                &dir.path().join("o"),
                "mp4",
                &tx,
                &CancelSignal::new(),
            )
            .unwrap_err();
        assert!(matches!(err, DownloadError::ToolMissing { .. }));
    }
}
