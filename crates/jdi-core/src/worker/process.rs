//! Out-of-process workers: each job re-invokes our own binary as `jdi worker`.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

use super::{JobOutcome, JobSpec, Launcher, WorkerHandle};
use crate::control::CancelSignal;
use crate::progress::{decode_event_line, ProgressSender};

/// Line that asks a process worker to stop.
pub(super) const CANCEL_LINE: &str = "cancel";

#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `<this executable> worker`.
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, ["worker"]))
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, spec: JobSpec, progress: ProgressSender, _cancel: CancelSignal) -> io::Result<Box<dyn WorkerHandle>> {
        let line = serde_json::to_string(&spec).map_err(io::Error::other)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let pid = child.id();

        let mut stdin = child.stdin.take();
        if let Some(w) = stdin.as_mut() {
            if let Err(e) = writeln!(w, "{line}").and_then(|_| w.flush()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }

        if let Some(stdout) = child.stdout.take() {
            std::thread::Builder::new()
                .name(format!("jdi-worker-{pid}-events"))
                .spawn(move || forward_events(stdout, progress))?;
        }
        tracing::debug!(job = spec.job_id, pid, "worker process started");

        Ok(Box::new(ProcessHandle {
            child,
            stdin,
            outcome: None,
        }))
    }
}

/// Relays event lines until the worker closes stdout. Dropping `progress`
/// at the end is what tells the monitor the worker is gone.
fn forward_events(stdout: impl io::Read, progress: ProgressSender) {
    for line in BufReader::new(stdout).lines() {
        let Ok(line) = line else { break };
        match decode_event_line(&line) {
            Some(ev) => progress.send(ev),
            None if line.trim().is_empty() => {}
            None => tracing::debug!(line = %line, "ignoring non-event worker output"),
        }
    }
}

struct ProcessHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    outcome: Option<JobOutcome>,
}

impl WorkerHandle for ProcessHandle {
    fn try_outcome(&mut self) -> Option<JobOutcome> {
        if self.outcome.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.outcome = Some(JobOutcome::from_exit_code(status.code()));
                    self.stdin = None;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(pid = self.child.id(), error = %e, "try_wait failed");
                    self.outcome = Some(JobOutcome::Failed);
                }
            }
        }
        self.outcome
    }

    fn request_cancel(&mut self) {
        if let Some(w) = self.stdin.as_mut() {
            if let Err(e) = writeln!(w, "{CANCEL_LINE}").and_then(|_| w.flush()) {
                tracing::debug!(pid = self.child.id(), error = %e, "could not forward cancel");
            }
        }
    }

    fn kill(&mut self) {
        if self.try_outcome().is_some() {
            return;
        }
        tracing::warn!(pid = self.child.id(), "killing worker process");
        if let Err(e) = self.child.kill() {
            tracing::debug!(error = %e, "kill failed");
        }
        let _ = self.child.wait();
        self.stdin = None;
        self.outcome = Some(JobOutcome::Cancelled);
    }

    fn describe(&self) -> String {
        format!("pid {}", self.child.id())
    }
}
