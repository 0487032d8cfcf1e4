//! Progress events and the worker → orchestrator channel.
//!
//! Every worker owns the producer side of exactly one channel; the
//! orchestrator's monitor for that job owns the consumer side. Across a process
//! boundary the same events travel as JSON lines (see `wire`).

mod channel;
mod rate;
mod stats;
mod wire;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use channel::{progress_channel, ProgressReceiver, ProgressSender};
pub use rate::RateLimiter;
pub use stats::TransferStats;
pub use wire::{decode_event_line, encode_event_line};

/// Which transfer a `Progress` event describes. Streams of one job progress
/// independently; consumers must not assume any interleaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    File,
    Video,
    Audio,
    Muxing,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StreamKind::File => "file",
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Muxing => "muxing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Human-readable narration ("Connecting...", "Muxing...").
    Status { message: String },
    Progress {
        stream: StreamKind,
        /// 0.0 ..= 100.0
        percent: f64,
        bytes_done: u64,
        bytes_total: u64,
        /// Bytes per second.
        rate: f64,
    },
    Title { title: String },
    Completed { result_paths: Vec<PathBuf> },
    Cancelled,
    Error { message: String },
}

impl ProgressEvent {
    pub fn status(message: impl Into<String>) -> Self {
        ProgressEvent::Status {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
        }
    }

    /// Completed, Cancelled and Error end a job's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Completed { .. } | ProgressEvent::Cancelled | ProgressEvent::Error { .. }
        )
    }
}
