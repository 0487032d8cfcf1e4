//! Typed errors for download jobs.
//!
//! Worker code returns `DownloadError`; the job runner turns it into the
//! terminal `ProgressEvent` (`Cancelled` for the cancel outcome, `Error` with
//! the raw message otherwise).

use thiserror::Error;

use crate::retry::TransferError;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Connection, timeout, HTTP status or short-transfer failure.
    #[error("{0}")]
    Transport(#[from] TransferError),

    /// The extraction service offered no format matching the request.
    #[error("no matching media format: {0}")]
    FormatResolution(String),

    /// The merge subprocess exited non-zero.
    #[error("muxing failed (code={code:?}): {stderr}")]
    Mux { code: Option<i32>, stderr: String },

    #[error("external tool is missing: {tool}")]
    ToolMissing { tool: String },

    #[error("{tool} failed (code={code:?}): {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Not a failure: the job observed its cancel signal.
    #[error("download cancelled")]
    Cancelled,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DownloadError {
    /// True for the cancel outcome, however deep in the stack it was raised.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            DownloadError::Cancelled | DownloadError::Transport(TransferError::Cancelled)
        )
    }

    /// Maps a spawn failure of an external executable to `ToolMissing` when
    /// the program does not exist.
    pub(crate) fn from_spawn(tool: &str, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::ToolMissing {
                tool: tool.to_string(),
            },
            _ => DownloadError::Io(e),
        }
    }
}

impl From<tempfile::PathPersistError> for DownloadError {
    fn from(e: tempfile::PathPersistError) -> Self {
        DownloadError::Io(e.error)
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;
