use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::{MediaRequest, DEFAULT_AUDIO_BITRATE, DEFAULT_VIDEO_HEIGHT};
use crate::segmenter::DEFAULT_MIN_CHUNK_SIZE;

/// Chunk retry parameters (`[retry]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per chunk, including the first.
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (0.25 = 250 ms).
    pub base_delay_secs: f64,
    /// Cap on a single backoff delay, in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 5,
        }
    }
}

/// Defaults for YouTube-like downloads (`[media]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub video_height: u32,
    /// kbit/s
    pub audio_bitrate: u32,
    pub audio: bool,
    pub video: bool,
    pub mux: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            video_height: DEFAULT_VIDEO_HEIGHT,
            audio_bitrate: DEFAULT_AUDIO_BITRATE,
            audio: true,
            video: true,
            mux: true,
        }
    }
}

impl MediaConfig {
    pub fn to_request(&self) -> MediaRequest {
        MediaRequest {
            video_height: Some(self.video_height),
            audio_bitrate: Some(self.audio_bitrate),
            audio: self.audio,
            video: self.video,
            mux: self.mux,
        }
    }
}

/// External programs, by name (looked up on PATH) or absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

/// Where jobs run: a child `jdi worker` process each, or a thread in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerIsolation {
    #[default]
    Process,
    Thread,
}

/// Global configuration loaded from `~/.config/jdi/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JdiConfig {
    /// Jobs running at once; further jobs wait in the pending queue.
    pub max_concurrent_downloads: usize,
    /// Connections (chunks) per plain-file download.
    pub download_threads: usize,
    /// Smallest chunk worth its own connection, in bytes.
    pub min_chunk_size: u64,
    /// Defaults to the XDG download dir, then the current directory.
    pub download_dir: Option<PathBuf>,
    pub worker_isolation: WorkerIsolation,
    /// How long a cancelled worker gets before it is killed.
    pub cancel_grace_ms: u64,
    pub progress_interval_ms: u64,
    pub pending_poll_ms: u64,
    /// Probe every URL before queueing it.
    pub validate_urls: bool,
    /// Netscape cookies.txt used for authenticated downloads.
    pub cookies_file: Option<PathBuf>,
    pub retry: RetryConfig,
    pub media: MediaConfig,
    pub tools: ToolsConfig,
}

impl Default for JdiConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
            download_threads: 4,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            download_dir: None,
            worker_isolation: WorkerIsolation::Process,
            cancel_grace_ms: 500,
            progress_interval_ms: 50,
            pending_poll_ms: 1000,
            validate_urls: true,
            cookies_file: None,
            retry: RetryConfig::default(),
            media: MediaConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl JdiConfig {
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn pending_poll(&self) -> Duration {
        Duration::from_millis(self.pending_poll_ms.max(10))
    }

    /// `download_dir` if set, else `$HOME/Downloads` when it exists, else `.`.
    pub fn resolve_download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Downloads"))
            .filter(|p| p.is_dir())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jdi")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<JdiConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<JdiConfig> {
    if !path.exists() {
        let default_cfg = JdiConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: JdiConfig = toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = JdiConfig::default();
        assert_eq!(cfg.max_concurrent_downloads, 4);
        assert_eq!(cfg.download_threads, 4);
        assert_eq!(cfg.min_chunk_size, 1024 * 1024);
        assert_eq!(cfg.worker_isolation, WorkerIsolation::Process);
        assert_eq!(cfg.cancel_grace(), Duration::from_millis(500));
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.media.video_height, 1080);
        assert_eq!(cfg.media.audio_bitrate, 128);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = JdiConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: JdiConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml = r#"
            max_concurrent_downloads = 2
            worker_isolation = "thread"

            [retry]
            max_attempts = 5

            [media]
            mux = false

            [tools]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
        "#;
        let cfg: JdiConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent_downloads, 2);
        assert_eq!(cfg.download_threads, 4);
        assert_eq!(cfg.worker_isolation, WorkerIsolation::Thread);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert!((cfg.retry.base_delay_secs - 0.25).abs() < 1e-9);
        assert!(!cfg.media.mux && cfg.media.audio);
        assert_eq!(cfg.tools.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(cfg.tools.ytdlp, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn load_or_init_creates_then_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let first = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        fs::write(&path, "download_threads = 8\n").unwrap();
        let second = load_or_init_at(&path).unwrap();
        assert_eq!(first.download_threads, 4);
        assert_eq!(second.download_threads, 8);
    }

    #[test]
    fn bad_isolation_is_rejected() {
        assert!(toml::from_str::<JdiConfig>("worker_isolation = \"fork\"").is_err());
    }
}
