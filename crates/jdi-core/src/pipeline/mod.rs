//! Audio + video download with a join barrier before the merge.
//!
//! Each enabled stream is fetched on its own thread into its own temp file.
//! Nothing is merged or moved until every stream has finished; one failed
//! stream stops its sibling and all temp files are dropped.

mod naming;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use tracing::Span;

use crate::control::CancelSignal;
use crate::error::DownloadError;
use crate::media::{output_extension, select_audio, select_video, MediaExtractor, MediaFormat};
use crate::mux::Muxer;
use crate::progress::{ProgressEvent, ProgressSender, StreamKind};
use crate::storage;

pub use naming::output_stem;

pub const DEFAULT_VIDEO_HEIGHT: u32 = 1080;
pub const DEFAULT_AUDIO_BITRATE: u32 = 128;

/// What to fetch for one media URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRequest {
    /// Target height; `None` means `DEFAULT_VIDEO_HEIGHT`.
    pub video_height: Option<u32>,
    /// Target bitrate in kbit/s; `None` means `DEFAULT_AUDIO_BITRATE`.
    pub audio_bitrate: Option<u32>,
    pub audio: bool,
    pub video: bool,
    pub mux: bool,
}

impl Default for MediaRequest {
    fn default() -> Self {
        Self {
            video_height: None,
            audio_bitrate: None,
            audio: true,
            video: true,
            mux: true,
        }
    }
}

impl MediaRequest {
    pub fn audio_only() -> Self {
        Self {
            video: false,
            mux: false,
            ..Self::default()
        }
    }
}

pub struct StreamMuxPipeline {
    extractor: Arc<dyn MediaExtractor>,
    muxer: Muxer,
    span: Span,
}

struct Selected<'a> {
    stream: StreamKind,
    format: &'a MediaFormat,
    temp: TempPath,
}

impl StreamMuxPipeline {
    pub fn new(extractor: Arc<dyn MediaExtractor>, muxer: Muxer) -> Self {
        Self {
            extractor,
            muxer,
            span: Span::current(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Fetches the requested streams of `url` and returns the produced files
    /// (one merged file, or one file per stream when not muxing).
    pub fn download_and_mux(
        &self,
        url: &str,
        destination_folder: &Path,
        request: &MediaRequest,
        progress: &ProgressSender,
        cancel: &CancelSignal,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        let _g = self.span.enter();
        if !request.audio && !request.video {
            return Err(DownloadError::FormatResolution(
                "both audio and video are disabled".to_string(),
            ));
        }
        cancel.check()?;
        progress.status("Connecting...");

        let info = self.extractor.resolve_formats(url, cancel)?;
        progress.send(ProgressEvent::Title {
            title: info.title.clone(),
        });
        let stem = output_stem(&info.title);

        let mut selected = Vec::with_capacity(2);
        if request.video {
            let target = request.video_height.unwrap_or(DEFAULT_VIDEO_HEIGHT);
            let format = select_video(&info.formats, target).ok_or_else(|| {
                DownloadError::FormatResolution(format!("no video-only format near {target}p"))
            })?;
            tracing::debug!(url, format = %format.format_id, height = ?format.height, "video selected");
            selected.push(Selected {
                stream: StreamKind::Video,
                format,
                temp: storage::reserve_temp_path(destination_folder, "video")?,
            });
        }
        if request.audio {
            let target = request.audio_bitrate.unwrap_or(DEFAULT_AUDIO_BITRATE);
            let format = select_audio(&info.formats, target).ok_or_else(|| {
                DownloadError::FormatResolution(format!("no audio-only format near {target}k"))
            })?;
            tracing::debug!(url, format = %format.format_id, abr = ?format.abr, "audio selected");
            selected.push(Selected {
                stream: StreamKind::Audio,
                format,
                temp: storage::reserve_temp_path(destination_folder, "audio")?,
            });
        }

        progress.status("Downloading...");
        self.fetch_all(url, &selected, progress, cancel)?;

        if request.mux && selected.len() == 2 {
            let (video, audio) = (&selected[0], &selected[1]);
            let ext = output_extension(video.format, audio.format);
            progress.status("Muxing...");
            let out = storage::reserve_temp_path(destination_folder, "mux")?;
            self.muxer
                .mux(&video.temp, &audio.temp, &out, ext, progress, cancel)?;
            let path = storage::persist_unique(out, &destination_folder.join(format!("{stem}.{ext}")))?;
            // `selected` drops here, deleting the stream temps.
            return Ok(vec![path]);
        }

        let mut paths = Vec::with_capacity(selected.len());
        for s in selected {
            let desired = destination_folder.join(format!("{stem}.{}", s.format.ext));
            paths.push(storage::persist_unique(s.temp, &desired)?);
        }
        Ok(paths)
    }

    /// Join barrier: every stream finishes (or is stopped) before this returns.
    fn fetch_all(
        &self,
        url: &str,
        selected: &[Selected<'_>],
        progress: &ProgressSender,
        cancel: &CancelSignal,
    ) -> Result<(), DownloadError> {
        let stop = cancel.child();
        let span = self.span.clone();
        let extractor = self.extractor.as_ref();

        let results: Vec<Result<(), DownloadError>> = std::thread::scope(|s| {
            let handles: Vec<_> = selected
                .iter()
                .map(|sel| {
                    let (stop, span) = (&stop, span.clone());
                    s.spawn(move || {
                        let _g = span.enter();
                        let res = extractor.fetch_stream(url, sel.format, &sel.temp, sel.stream, progress, stop);
                        if let Err(e) = &res {
                            if !e.is_cancelled() {
                                tracing::warn!(stream = %sel.stream, error = %e, "stream failed; stopping sibling");
                            }
                            stop.cancel();
                        }
                        res
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(DownloadError::Io(std::io::Error::other("stream thread panicked")))
                    })
                })
                .collect()
        });

        cancel.check()?;
        let mut sibling_stopped = false;
        for r in results {
            match r {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => sibling_stopped = true,
                Err(e) => return Err(e),
            }
        }
        if sibling_stopped {
            return Err(DownloadError::Cancelled);
        }
        Ok(())
    }
}
