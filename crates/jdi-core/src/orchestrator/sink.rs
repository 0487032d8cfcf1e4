//! The presentation layer's side of the progress stream.

use std::sync::Mutex;

use crate::progress::ProgressEvent;

/// Receives every forwarded event. Called from monitor threads, so
/// implementations must be cheap and must not call back into the
/// orchestrator synchronously.
pub trait PresentationSink: Send + Sync {
    fn on_event(&self, job_id: u64, event: &ProgressEvent);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn on_event(&self, _job_id: u64, _event: &ProgressEvent) {}
}

/// Records events in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(u64, ProgressEvent)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(u64, ProgressEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, job_id: u64) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl PresentationSink for RecordingSink {
    fn on_event(&self, job_id: u64, event: &ProgressEvent) {
        self.events.lock().unwrap().push((job_id, event.clone()));
    }
}
