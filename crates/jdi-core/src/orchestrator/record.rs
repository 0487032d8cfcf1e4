//! Per-job bookkeeping owned by the orchestrator.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::pipeline::MediaRequest;
use crate::pool::WorkerId;
use crate::worker::{JobKind, JobSettings, JobSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Read-only view of a job handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: u64,
    pub kind: JobKind,
    pub source_url: String,
    pub destination_folder: PathBuf,
    pub state: JobState,
    pub title: Option<String>,
    pub result_paths: Vec<PathBuf>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub(super) struct JobRecord {
    pub id: u64,
    pub kind: JobKind,
    pub source_url: String,
    pub destination_folder: PathBuf,
    pub media: MediaRequest,
    pub headers: HashMap<String, String>,
    pub cookie_file: Option<PathBuf>,
    pub state: JobState,
    pub worker: Option<WorkerId>,
    pub cancel_requested: bool,
    pub title: Option<String>,
    pub result_paths: Vec<PathBuf>,
    pub error: Option<String>,
}

impl JobRecord {
    /// The worker's copy of this job, with the current global settings.
    pub fn to_spec(&self, template: &JobSettings) -> JobSpec {
        let mut settings = template.clone();
        settings.media = self.media.clone();
        settings.headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        if self.cookie_file.is_some() {
            settings.cookie_file = self.cookie_file.clone();
        }
        JobSpec {
            job_id: self.id,
            kind: self.kind,
            url: self.source_url.clone(),
            destination_folder: self.destination_folder.clone(),
            settings,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            kind: self.kind,
            source_url: self.source_url.clone(),
            destination_folder: self.destination_folder.clone(),
            state: self.state,
            title: self.title.clone(),
            result_paths: self.result_paths.clone(),
            error: self.error.clone(),
        }
    }
}
