//! Shared downloaded-bytes counter for all chunk tasks of one download.

use std::sync::Mutex;

/// Running total that is clamped to `[0, total]` on every update, so a reader
/// never observes an out-of-range value even when chunks race or a failed
/// attempt is rolled back before a retry.
#[derive(Debug)]
pub struct ByteCounter {
    total: u64,
    done: Mutex<u64>,
}

impl ByteCounter {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            done: Mutex::new(0),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Adds `n` bytes and returns the clamped running total.
    pub fn add(&self, n: u64) -> u64 {
        let mut done = self.done.lock().unwrap();
        *done = done.saturating_add(n).min(self.total);
        *done
    }

    /// Removes `n` bytes (a chunk attempt that will be retried from scratch).
    pub fn rollback(&self, n: u64) -> u64 {
        let mut done = self.done.lock().unwrap();
        *done = done.saturating_sub(n);
        *done
    }

    pub fn get(&self) -> u64 {
        *self.done.lock().unwrap()
    }
}
