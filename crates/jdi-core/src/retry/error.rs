//! Transfer error type for retry classification.

use thiserror::Error;

/// Failure of one HTTP transfer (probe, range fetch or streaming GET).
#[derive(Debug, Error)]
pub enum TransferError {
    /// libcurl reported an error (timeout, connection, resolve, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Transfer ended with fewer (or more) bytes than the range asked for,
    /// e.g. the server closed early or ignored the Range header.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Writing the received body to disk failed. Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// The cancel signal tripped mid-transfer.
    #[error("transfer cancelled")]
    Cancelled,
}
