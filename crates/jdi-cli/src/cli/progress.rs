//! Terminal rendering of orchestrator events.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use jdi_core::orchestrator::PresentationSink;
use jdi_core::{ProgressEvent, StreamKind};

const PRINT_INTERVAL: Duration = Duration::from_millis(500);

/// Prints one line per event to stdout. Progress lines are thinned to one per
/// half second per (job, stream); the 100% line always shows.
#[derive(Default)]
pub struct TerminalSink {
    last_print: Mutex<HashMap<(u64, StreamKind), Instant>>,
}

impl TerminalSink {
    fn should_print(&self, job_id: u64, stream: StreamKind, percent: f64) -> bool {
        let now = Instant::now();
        let mut last = self.last_print.lock().unwrap();
        let due = percent >= 100.0
            || last
                .get(&(job_id, stream))
                .map_or(true, |t| now.duration_since(*t) >= PRINT_INTERVAL);
        if due {
            last.insert((job_id, stream), now);
        }
        due
    }
}

impl PresentationSink for TerminalSink {
    fn on_event(&self, job_id: u64, event: &ProgressEvent) {
        if let ProgressEvent::Progress { stream, percent, .. } = event {
            if !self.should_print(job_id, *stream, *percent) {
                return;
            }
        }
        let line = render_event(job_id, event);
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}

pub fn render_event(job_id: u64, event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Status { message } => format!("[{job_id}] {message}"),
        ProgressEvent::Title { title } => format!("[{job_id}] title: {title}"),
        ProgressEvent::Progress {
            stream,
            percent,
            bytes_done,
            bytes_total,
            rate,
        } => {
            let name = stream.to_string();
            if *bytes_total == 0 {
                format!("[{job_id}] {name:<6} {percent:5.1}%")
            } else {
                format!(
                    "[{job_id}] {name:<6} {percent:5.1}%  {:.1} / {:.1} MiB  {:.2} MiB/s",
                    mib(*bytes_done),
                    mib(*bytes_total),
                    rate / 1_048_576.0
                )
            }
        }
        ProgressEvent::Completed { result_paths } => {
            let paths: Vec<String> = result_paths.iter().map(|p| p.display().to_string()).collect();
            format!("[{job_id}] done: {}", paths.join(", "))
        }
        ProgressEvent::Cancelled => format!("[{job_id}] cancelled"),
        ProgressEvent::Error { message } => format!("[{job_id}] error: {message}"),
    }
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}
