//! Turning a `JobSpec` into work, and work into a terminal event.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::control::CancelSignal;
use crate::downloader::{ChunkedTransferEngine, TransferOptions};
use crate::error::DownloadError;
use crate::media::{MediaExtractor, YtDlp};
use crate::mux::Muxer;
use crate::pipeline::{MediaRequest, StreamMuxPipeline};
use crate::progress::{ProgressEvent, ProgressSender};
use crate::retry::RetryPolicy;

use super::job::{JobKind, JobSpec};
use super::JobOutcome;

/// Performs a job. Implementations emit non-terminal events only; `execute`
/// adds the terminal one.
pub trait JobRunner: Send + Sync {
    fn run(&self, spec: &JobSpec, progress: &ProgressSender, cancel: &CancelSignal) -> Result<Vec<PathBuf>, DownloadError>;
}

/// Runs `spec` and emits exactly one terminal event for it.
pub fn execute(runner: &dyn JobRunner, spec: &JobSpec, progress: &ProgressSender, cancel: &CancelSignal) -> JobOutcome {
    let span = tracing::info_span!("job", id = spec.job_id, kind = ?spec.kind);
    let _g = span.enter();
    tracing::info!(url = %spec.url, "job started");

    match runner.run(spec, progress, cancel) {
        Ok(result_paths) => {
            tracing::info!(files = result_paths.len(), "job completed");
            progress.send(ProgressEvent::Completed { result_paths });
            JobOutcome::Completed
        }
        Err(e) if e.is_cancelled() => {
            tracing::info!("job cancelled");
            progress.send(ProgressEvent::Cancelled);
            JobOutcome::Cancelled
        }
        Err(e) => {
            tracing::warn!(error = %e, "job failed");
            progress.send(ProgressEvent::error(e.to_string()));
            JobOutcome::Failed
        }
    }
}

/// Production runner: chunked engine for plain files, stream pipeline for media.
#[derive(Default, Clone)]
pub struct DownloadRunner {
    extractor: Option<Arc<dyn MediaExtractor>>,
}

impl DownloadRunner {
    /// Uses `extractor` instead of spawning yt-dlp.
    pub fn with_extractor(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self {
            extractor: Some(extractor),
        }
    }
}

impl JobRunner for DownloadRunner {
    fn run(&self, spec: &JobSpec, progress: &ProgressSender, cancel: &CancelSignal) -> Result<Vec<PathBuf>, DownloadError> {
        let s = &spec.settings;
        let grace = Duration::from_millis(s.cancel_grace_ms);
        let interval = Duration::from_millis(s.progress_interval_ms);
        std::fs::create_dir_all(&spec.destination_folder)?;

        match spec.kind {
            JobKind::PlainFile => {
                let engine = ChunkedTransferEngine::new(TransferOptions {
                    thread_count: s.thread_count,
                    min_chunk_size: s.min_chunk_size,
                    retry: RetryPolicy::from(&s.retry),
                    progress_interval: interval,
                    headers: s.headers.clone(),
                });
                let path = engine.download(&spec.url, &spec.destination_folder, progress, cancel)?;
                Ok(vec![path])
            }
            JobKind::YouTubeCombined | JobKind::YouTubeAudioOnly => {
                let extractor: Arc<dyn MediaExtractor> = match &self.extractor {
                    Some(e) => Arc::clone(e),
                    None => Arc::new(
                        YtDlp::new(&s.tools.ytdlp)
                            .with_cookie_file(s.cookie_file.clone())
                            .with_grace(grace)
                            .with_progress_interval(interval),
                    ),
                };
                let muxer = Muxer::new(&s.tools.ffmpeg)
                    .with_grace(grace)
                    .with_progress_interval(interval);
                let request = match spec.kind {
                    JobKind::YouTubeAudioOnly => MediaRequest {
                        audio_bitrate: s.media.audio_bitrate,
                        ..MediaRequest::audio_only()
                    },
                    _ => s.media.clone(),
                };
                StreamMuxPipeline::new(extractor, muxer).download_and_mux(
                    &spec.url,
                    &spec.destination_folder,
                    &request,
                    progress,
                    cancel,
                )
            }
        }
    }
}
