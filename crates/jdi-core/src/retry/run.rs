//! Retry loop: run a transfer until success, a permanent error, or cancel.

use super::classify::classify;
use super::error::TransferError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelSignal;

/// Runs `f` (given the 1-based attempt number) until it succeeds or the
/// policy says stop. Backoff sleeps wake early when `cancel` trips.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, cancel: &CancelSignal, mut f: F) -> Result<T, TransferError>
where
    F: FnMut(u32) -> Result<T, TransferError>,
{
    let mut attempt = 1u32;
    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::debug!(attempt, delay_ms = d.as_millis() as u64, "retrying after: {}", e);
                    if !cancel.sleep(d) {
                        return Err(TransferError::Cancelled);
                    }
                    attempt += 1;
                }
            },
        }
    }
}
