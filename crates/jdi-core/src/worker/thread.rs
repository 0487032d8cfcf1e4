//! In-process workers: one thread per job.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use super::{execute, JobOutcome, JobRunner, JobSpec, Launcher, WorkerHandle};
use crate::control::CancelSignal;
use crate::progress::ProgressSender;

pub struct ThreadLauncher {
    runner: Arc<dyn JobRunner>,
}

impl ThreadLauncher {
    pub fn new(runner: Arc<dyn JobRunner>) -> Self {
        Self { runner }
    }
}

impl Launcher for ThreadLauncher {
    fn launch(&self, spec: JobSpec, progress: ProgressSender, cancel: CancelSignal) -> io::Result<Box<dyn WorkerHandle>> {
        let runner = Arc::clone(&self.runner);
        let name = format!("jdi-job-{}", spec.job_id);
        let join = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || execute(runner.as_ref(), &spec, &progress, &cancel))?;
        Ok(Box::new(ThreadHandle {
            name,
            join: Some(join),
            outcome: None,
        }))
    }
}

struct ThreadHandle {
    name: String,
    join: Option<JoinHandle<JobOutcome>>,
    outcome: Option<JobOutcome>,
}

impl WorkerHandle for ThreadHandle {
    fn try_outcome(&mut self) -> Option<JobOutcome> {
        if self.outcome.is_none() && self.join.as_ref().is_some_and(|j| j.is_finished()) {
            if let Some(join) = self.join.take() {
                self.outcome = Some(join.join().unwrap_or_else(|_| {
                    tracing::error!(worker = %self.name, "worker thread panicked");
                    JobOutcome::Failed
                }));
            }
        }
        self.outcome
    }

    /// Threads cannot be killed; the thread is detached and left to notice
    /// its (already tripped) cancel signal.
    fn kill(&mut self) {
        if self.join.take().is_some() {
            tracing::warn!(worker = %self.name, "detaching unresponsive worker thread");
        }
        self.outcome.get_or_insert(JobOutcome::Cancelled);
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
