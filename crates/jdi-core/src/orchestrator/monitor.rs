//! One thread per running job: forwards its events and records how it ended.

use std::collections::HashMap;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::record::JobState;
use super::{drain_pending, Shared};
use crate::pool::{WorkerId, WorkerStatus};
use crate::progress::{ProgressEvent, ProgressReceiver, StreamKind};

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) fn watch(shared: Arc<Shared>, job_id: u64, worker: WorkerId, events: ProgressReceiver) {
    let _g = shared.span.enter();
    let mut gate = ProgressGate::new(shared.progress_interval);

    let terminal = loop {
        match events.recv_timeout(RECV_TIMEOUT) {
            Ok(ev) if ev.is_terminal() => break Some(ev),
            Ok(ev) => forward(&shared, job_id, &mut gate, ev),
            Err(RecvTimeoutError::Timeout) => {
                for ev in gate.due() {
                    shared.sink.on_event(job_id, &ev);
                }
                // A killed process never closes a detached thread's sender,
                // so exit is also noticed through the pool.
                if shared.pool.status(worker) != WorkerStatus::Running {
                    break drain_after_exit(&shared, job_id, &mut gate, &events);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break None,
        }
    };
    for ev in gate.flush() {
        shared.sink.on_event(job_id, &ev);
    }

    if shared.pool.reclaim(worker, shared.pool.grace()).is_none() {
        tracing::warn!(job = job_id, worker = %worker, "worker still running after its final event; stopping it");
        shared.pool.cancel(worker);
    }
    shared.pool.forget(worker);

    let event = settle(&shared, job_id, terminal);
    if let Some(event) = event {
        shared.sink.on_event(job_id, &event);
    }
    shared.idle.notify_all();
    drain_pending(&shared);
}

/// The worker has exited but its event reader may still be relaying the last
/// lines. Reads until the channel closes, for at most the grace period.
fn drain_after_exit(
    shared: &Shared,
    job_id: u64,
    gate: &mut ProgressGate,
    events: &ProgressReceiver,
) -> Option<ProgressEvent> {
    let deadline = Instant::now() + shared.pool.grace();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(left) {
            Ok(ev) if ev.is_terminal() => return Some(ev),
            Ok(ev) => forward(shared, job_id, gate, ev),
            Err(_) => return None,
        }
    }
}

fn forward(shared: &Shared, job_id: u64, gate: &mut ProgressGate, ev: ProgressEvent) {
    if let ProgressEvent::Title { title } = &ev {
        if let Some(rec) = shared.book.lock().unwrap().jobs.get_mut(&job_id) {
            rec.title = Some(title.clone());
        }
    }
    if let Some(ev) = gate.admit(ev) {
        shared.sink.on_event(job_id, &ev);
    }
}

/// Writes the job's terminal state; returns the event to show for it, or
/// `None` if the job was already settled elsewhere.
fn settle(shared: &Shared, job_id: u64, terminal: Option<ProgressEvent>) -> Option<ProgressEvent> {
    let mut book = shared.book.lock().unwrap();
    let rec = book.jobs.get_mut(&job_id)?;
    if rec.state.is_terminal() {
        return None;
    }
    let event = match terminal {
        Some(ev) => ev,
        None if rec.cancel_requested => ProgressEvent::Cancelled,
        None => ProgressEvent::error("worker exited unexpectedly"),
    };
    match &event {
        ProgressEvent::Completed { result_paths } => {
            rec.state = JobState::Completed;
            rec.result_paths = result_paths.clone();
        }
        ProgressEvent::Error { message } => {
            rec.state = JobState::Failed;
            rec.error = Some(message.clone());
        }
        _ => rec.state = JobState::Cancelled,
    }
    tracing::info!(job = job_id, state = %rec.state, "job finished");
    Some(event)
}

/// Per-stream rate limit on `Progress` events. The newest suppressed event of
/// each stream is held back and released once its interval has passed, so
/// the last reading before a terminal event is never lost.
struct ProgressGate {
    interval: Duration,
    last_sent: HashMap<StreamKind, Instant>,
    held: HashMap<StreamKind, ProgressEvent>,
}

impl ProgressGate {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: HashMap::new(),
            held: HashMap::new(),
        }
    }

    fn admit(&mut self, ev: ProgressEvent) -> Option<ProgressEvent> {
        let ProgressEvent::Progress { stream, .. } = &ev else {
            return Some(ev);
        };
        let stream = *stream;
        let now = Instant::now();
        let open = self
            .last_sent
            .get(&stream)
            .map_or(true, |t| now.duration_since(*t) >= self.interval);
        if open {
            self.last_sent.insert(stream, now);
            self.held.remove(&stream);
            Some(ev)
        } else {
            self.held.insert(stream, ev);
            None
        }
    }

    /// Held events whose interval has passed.
    fn due(&mut self) -> Vec<ProgressEvent> {
        let now = Instant::now();
        let ready: Vec<StreamKind> = self
            .held
            .keys()
            .filter(|s| {
                self.last_sent
                    .get(*s)
                    .map_or(true, |t| now.duration_since(*t) >= self.interval)
            })
            .copied()
            .collect();
        ready
            .into_iter()
            .filter_map(|s| {
                self.last_sent.insert(s, now);
                self.held.remove(&s)
            })
            .collect()
    }

    fn flush(&mut self) -> Vec<ProgressEvent> {
        self.held.drain().map(|(_, ev)| ev).collect()
    }
}
