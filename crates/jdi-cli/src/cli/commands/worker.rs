//! `jdi worker` – one job per process, driven by the parent over stdin/stdout.

use jdi_core::worker::{run_worker_process, DownloadRunner};

/// Returns the worker exit code (0 completed, 1 failed, 3 cancelled).
pub fn run_worker() -> i32 {
    let runner = DownloadRunner::default();
    run_worker_process(&runner)
}
