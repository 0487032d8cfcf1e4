pub mod config;
pub mod control;
pub mod credentials;
pub mod downloader;
pub mod error;
pub mod fetch_head;
pub mod logging;
pub mod media;
pub mod mux;
pub mod orchestrator;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod retry;
pub mod segmenter;
pub mod storage;
pub mod subprocess;
pub mod url_model;
pub mod worker;

pub use control::CancelSignal;
pub use error::{DownloadError, Result};
pub use orchestrator::{DownloadOrchestrator, JobSnapshot, JobState, OrchestratorOptions, Services, SubmitReport, SubmitRequest};
pub use progress::{ProgressEvent, StreamKind};
