//! The self-contained description of one job, as handed to a worker.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{JdiConfig, RetryConfig, ToolsConfig};
use crate::pipeline::MediaRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    PlainFile,
    #[serde(rename = "youtube_combined")]
    YouTubeCombined,
    #[serde(rename = "youtube_audio_only")]
    YouTubeAudioOnly,
}

/// Everything a worker needs; serialized as one JSON line for process workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_id: u64,
    pub kind: JobKind,
    pub url: String,
    pub destination_folder: PathBuf,
    pub settings: JobSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    pub thread_count: usize,
    pub min_chunk_size: u64,
    pub retry: RetryConfig,
    pub progress_interval_ms: u64,
    pub cancel_grace_ms: u64,
    pub media: MediaRequest,
    /// Extra HTTP headers for plain-file jobs (e.g. `Cookie`).
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Cookie file passed to the media extractor.
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
    pub tools: ToolsConfig,
}

impl JobSettings {
    pub fn from_config(cfg: &JdiConfig) -> Self {
        Self {
            thread_count: cfg.download_threads.max(1),
            min_chunk_size: cfg.min_chunk_size,
            retry: cfg.retry.clone(),
            progress_interval_ms: cfg.progress_interval_ms,
            cancel_grace_ms: cfg.cancel_grace_ms,
            media: cfg.media.to_request(),
            headers: HashMap::new(),
            cookie_file: cfg.cookies_file.clone(),
            tools: cfg.tools.clone(),
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self::from_config(&JdiConfig::default())
    }
}
