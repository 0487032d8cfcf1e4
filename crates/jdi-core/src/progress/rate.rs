//! Minimum-interval gate for progress emission.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Lets one caller through per `interval`. Shared by all chunk tasks of a
/// download so the consumer sees a bounded update rate regardless of how many
/// connections are open.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// True if at least `interval` elapsed since the last accepted call.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap();
        match *last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_passes_then_throttles() {
        let r = RateLimiter::new(Duration::from_secs(60));
        assert!(r.try_acquire());
        assert!(!r.try_acquire());
    }

    #[test]
    fn zero_interval_always_passes() {
        let r = RateLimiter::new(Duration::ZERO);
        assert!(r.try_acquire());
        assert!(r.try_acquire());
    }
}
