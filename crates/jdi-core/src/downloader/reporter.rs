//! Rate-limited progress emission shared by all transfer threads of a download.

use std::time::{Duration, Instant};

use crate::progress::{ProgressSender, RateLimiter, StreamKind, TransferStats};

pub(crate) struct Reporter {
    sender: ProgressSender,
    stream: StreamKind,
    total: u64,
    started: Instant,
    limiter: RateLimiter,
}

impl Reporter {
    pub(crate) fn new(sender: ProgressSender, stream: StreamKind, total: u64, interval: Duration) -> Self {
        Self {
            sender,
            stream,
            total,
            started: Instant::now(),
            limiter: RateLimiter::new(interval),
        }
    }

    /// Emits a `Progress` event unless one went out less than an interval ago.
    pub(crate) fn report(&self, done: u64) {
        if self.limiter.try_acquire() {
            self.emit(done);
        }
    }

    /// Final update; bypasses the limiter so the consumer always sees the end state.
    pub(crate) fn finish(&self, done: u64) {
        self.emit(done);
    }

    fn emit(&self, done: u64) {
        let stats = TransferStats {
            bytes_done: done,
            total_bytes: self.total,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        };
        self.sender.send(stats.to_event(self.stream));
    }
}
