//! Retry and backoff for chunk transfers.
//!
//! Classifies transfer failures (timeouts, throttling, connection drops, short
//! bodies) and decides exponential backoff so transient errors on one chunk do
//! not fail a whole multi-connection download.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::TransferError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
