//! Cooperative job cancellation.
//!
//! A `CancelSignal` is written by whoever owns the job (the worker pool, or the
//! stdin reader of a worker process) and read by every task working on it.
//! Download loops poll it at bounded intervals; nothing is interrupted
//! preemptively.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::DownloadError;

#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    own: Arc<AtomicBool>,
    parents: Vec<Arc<AtomicBool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that trips when `self` trips, but can also be tripped on its
    /// own without affecting `self` (one failing chunk stops its siblings,
    /// not the job's owner).
    pub fn child(&self) -> Self {
        let mut parents = self.parents.clone();
        parents.push(Arc::clone(&self.own));
        Self {
            own: Arc::new(AtomicBool::new(false)),
            parents,
        }
    }

    /// Trip the signal. Idempotent.
    pub fn cancel(&self) {
        self.own.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.own.load(Ordering::Acquire)
            || self.parents.iter().any(|p| p.load(Ordering::Acquire))
    }

    /// `Err(DownloadError::Cancelled)` once the signal has been tripped.
    pub fn check(&self) -> Result<(), DownloadError> {
        if self.is_cancelled() {
            Err(DownloadError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `total`, waking every 50 ms to look at the signal.
    /// Returns false if the signal tripped before the time was up.
    pub fn sleep(&self, total: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(50);
        let deadline = Instant::now() + total;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }
}

/// Default path for the control socket of a running `jdi get`.
pub fn default_control_socket_path() -> anyhow::Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("jdi")?;
    Ok(dirs.place_state_file("control.sock")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = CancelSignal::new();
        let b = a.clone();
        assert!(b.check().is_ok());
        a.cancel();
        assert!(b.is_cancelled());
        assert!(matches!(b.check(), Err(DownloadError::Cancelled)));
    }

    #[test]
    fn sleep_returns_early_when_cancelled() {
        let s = CancelSignal::new();
        let s2 = s.clone();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            s2.cancel();
        });
        let start = Instant::now();
        assert!(!s.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(2));
        t.join().unwrap();
    }

    #[test]
    fn child_follows_parent_but_not_back() {
        let parent = CancelSignal::new();
        let a = parent.child();
        let b = parent.child();
        a.cancel();
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!parent.is_cancelled());
        parent.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn sleep_completes_without_cancel() {
        assert!(CancelSignal::new().sleep(Duration::from_millis(20)));
    }
}
