//! Media extraction service: format resolution, playlist expansion and
//! single-stream fetch for YouTube-like URLs.

mod quality;
mod select;
mod ytdlp;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::control::CancelSignal;
use crate::error::DownloadError;
use crate::progress::{ProgressSender, StreamKind};

pub use quality::{parse_audio_quality, parse_video_quality};
pub use select::{closest_match, output_extension, select_audio, select_video};
pub use ytdlp::YtDlp;

/// One downloadable rendition offered by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFormat {
    pub format_id: String,
    pub ext: String,
    pub height: Option<u32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    /// Audio bitrate, kbit/s.
    pub abr: Option<f64>,
    /// Total bitrate, kbit/s.
    pub tbr: Option<f64>,
    pub filesize: Option<u64>,
}

impl MediaFormat {
    pub fn has_video(&self) -> bool {
        codec_present(&self.vcodec) || (self.height.is_some() && self.vcodec.is_none())
    }

    pub fn has_audio(&self) -> bool {
        codec_present(&self.acodec) || (self.abr.is_some() && self.acodec.is_none())
    }

    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }
}

fn codec_present(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| !c.is_empty() && c != "none")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    /// Seconds, when known.
    pub duration: Option<f64>,
    pub formats: Vec<MediaFormat>,
}

/// Black-box extraction service (yt-dlp in production, fakes in tests).
pub trait MediaExtractor: Send + Sync {
    fn resolve_formats(&self, url: &str, cancel: &CancelSignal) -> Result<MediaInfo, DownloadError>;

    /// Item URLs of a playlist, in playlist order.
    fn expand_playlist(&self, url: &str, cancel: &CancelSignal) -> Result<Vec<String>, DownloadError>;

    /// Downloads one format to exactly `dest` (overwriting it), emitting
    /// `Progress` events tagged with `stream`.
    fn fetch_stream(
        &self,
        url: &str,
        format: &MediaFormat,
        dest: &Path,
        stream: StreamKind,
        progress: &ProgressSender,
        cancel: &CancelSignal,
    ) -> Result<(), DownloadError>;
}


#[cfg(test)]
mod tests {
    use super::test_support::{audio, video};

    #[test]
    fn stream_kinds() {
        let v = video("137", 1080, "mp4", 4000.0);
        let a = audio("140", 129.5, "m4a");
        assert!(v.is_video_only() && !v.is_audio_only());
        assert!(a.is_audio_only() && !a.is_video_only());

        let mut muxed = v.clone();
        muxed.acodec = Some("mp4a.40.2".into());
        assert!(!muxed.is_video_only() && !muxed.is_audio_only());
    }
}
