//! The worker side of the process protocol (`jdi worker`).

use std::io::{self, BufRead, Write};
use std::time::Duration;

use super::process::CANCEL_LINE;
use super::{execute, JobOutcome, JobRunner, JobSpec};
use crate::control::CancelSignal;
use crate::progress::{encode_event_line, progress_channel, ProgressEvent};

/// Serves one job over this process's stdin/stdout; returns the exit code.
pub fn run_worker_process(runner: &dyn JobRunner) -> i32 {
    serve_worker(runner, io::BufReader::new(io::stdin()), io::stdout()).exit_code()
}

/// Reads the job spec from the first line of `input`, runs it, and writes
/// every event to `output` as a JSON line. A later `cancel` line or the end
/// of `input` trips the job's cancel signal.
pub fn serve_worker<R, W>(runner: &dyn JobRunner, mut input: R, output: W) -> JobOutcome
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let (tx, rx) = progress_channel();
    let writer = std::thread::spawn(move || {
        let mut out = output;
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(ev) => {
                    let Ok(line) = encode_event_line(&ev) else { continue };
                    if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
                        // Parent went away; keep draining until the job ends.
                        continue;
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    let mut first = String::new();
    let spec: Result<JobSpec, String> = match input.read_line(&mut first) {
        Ok(0) => Err("no job spec on stdin".to_string()),
        Ok(_) => serde_json::from_str(first.trim()).map_err(|e| format!("bad job spec: {e}")),
        Err(e) => Err(format!("reading job spec: {e}")),
    };

    let outcome = match spec {
        Ok(spec) => {
            let cancel = CancelSignal::new();
            let watcher = cancel.clone();
            std::thread::spawn(move || watch_for_cancel(input, watcher));
            execute(runner, &spec, &tx, &cancel)
        }
        Err(msg) => {
            tracing::error!("{msg}");
            tx.send(ProgressEvent::error(msg));
            JobOutcome::Failed
        }
    };

    drop(tx);
    let _ = writer.join();
    outcome
}

fn watch_for_cancel<R: BufRead>(input: R, cancel: CancelSignal) {
    for line in input.lines() {
        match line {
            Ok(l) if l.trim() == CANCEL_LINE => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    tracing::debug!("cancel requested (line or stdin closed)");
    cancel.cancel();
}
