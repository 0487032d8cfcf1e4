use std::fmt;

use serde::{Deserialize, Serialize};

use crate::worker::JobOutcome;

/// Pool-assigned identifier of one worker (one launch of one job).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    NotFound,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkerStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerStatus::Completed | WorkerStatus::Failed | WorkerStatus::Cancelled)
    }
}

impl From<JobOutcome> for WorkerStatus {
    fn from(o: JobOutcome) -> Self {
        match o {
            JobOutcome::Completed => WorkerStatus::Completed,
            JobOutcome::Failed => WorkerStatus::Failed,
            JobOutcome::Cancelled => WorkerStatus::Cancelled,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Admission refused: every slot is busy. Callers queue and retry.
    #[error("worker pool is full ({capacity} running)")]
    Full { capacity: usize },
    #[error("failed to start worker: {0}")]
    Spawn(#[source] std::io::Error),
}
