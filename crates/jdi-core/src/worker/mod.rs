//! Job workers: what runs a job (`JobRunner`) and where it runs (`Launcher`).
//!
//! A launcher starts one worker per job and hands back a `WorkerHandle` the
//! pool uses to poll for exit, forward cancellation and force termination.
//! Process workers speak a line protocol: the `JobSpec` as JSON on the first
//! stdin line, then `cancel` (or EOF) to stop; progress events come back as
//! JSON lines on stdout and the exit code carries the outcome.

mod entry;
mod job;
mod process;
mod runner;
mod thread;

use std::io;

use crate::control::CancelSignal;
use crate::progress::ProgressSender;

pub use entry::{run_worker_process, serve_worker};
pub use job::{JobKind, JobSettings, JobSpec};
pub use process::ProcessLauncher;
pub use runner::{execute, DownloadRunner, JobRunner};
pub use thread::ThreadLauncher;

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    Cancelled,
}

impl JobOutcome {
    /// Process exit code for a worker process.
    pub fn exit_code(self) -> i32 {
        match self {
            JobOutcome::Completed => 0,
            JobOutcome::Failed => 1,
            JobOutcome::Cancelled => 3,
        }
    }

    /// Crashes and unknown codes count as failures.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => JobOutcome::Completed,
            Some(3) => JobOutcome::Cancelled,
            _ => JobOutcome::Failed,
        }
    }
}

/// A running (or exited) worker.
pub trait WorkerHandle: Send {
    /// `Some` once the worker has exited.
    fn try_outcome(&mut self) -> Option<JobOutcome>;

    /// Passes a cancel request along a worker-specific channel. The job's
    /// `CancelSignal` has already been tripped by the caller.
    fn request_cancel(&mut self) {}

    /// Forced termination. Afterwards `try_outcome` reports `Cancelled`.
    fn kill(&mut self);

    /// Short label for logs (pid or thread name).
    fn describe(&self) -> String;
}

pub trait Launcher: Send + Sync {
    /// Starts `spec`. The worker owns `progress` (the channel closes when the
    /// worker is gone) and observes `cancel`.
    fn launch(&self, spec: JobSpec, progress: ProgressSender, cancel: CancelSignal) -> io::Result<Box<dyn WorkerHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        for o in [JobOutcome::Completed, JobOutcome::Failed, JobOutcome::Cancelled] {
            assert_eq!(JobOutcome::from_exit_code(Some(o.exit_code())), o);
        }
        assert_eq!(JobOutcome::from_exit_code(None), JobOutcome::Failed);
        assert_eq!(JobOutcome::from_exit_code(Some(101)), JobOutcome::Failed);
    }
}
