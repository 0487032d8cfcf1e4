//! Transfer statistics and their event form.

use super::{ProgressEvent, StreamKind};

/// Snapshot of one transfer's progress.
#[derive(Debug, Clone, Copy)]
pub struct TransferStats {
    pub bytes_done: u64,
    /// 0 when the size is unknown.
    pub total_bytes: u64,
    pub elapsed_secs: f64,
}

impl TransferStats {
    /// Average rate since start in bytes per second (0 if no time elapsed).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Percent complete in [0, 100]; 0 while the size is unknown.
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }

    pub fn to_event(&self, stream: StreamKind) -> ProgressEvent {
        ProgressEvent::Progress {
            stream,
            percent: self.percent(),
            bytes_done: self.bytes_done,
            bytes_total: self.total_bytes,
            rate: self.bytes_per_sec(),
        }
    }
}
