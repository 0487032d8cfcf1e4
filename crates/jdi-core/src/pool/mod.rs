//! Capacity-bounded pool of job workers.
//!
//! One mutex guards the registry, so admission (`submit`) and reclamation
//! never interleave. Waiting for a worker to exit happens outside the lock.

mod status;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::Span;

use crate::control::CancelSignal;
use crate::progress::{progress_channel, ProgressReceiver};
use crate::worker::{JobSpec, Launcher, WorkerHandle};

pub use status::{PoolError, WorkerId, WorkerStatus};

const EXIT_POLL: Duration = Duration::from_millis(20);

struct Entry {
    job_id: u64,
    handle: Box<dyn WorkerHandle>,
    cancel: CancelSignal,
}

struct Registry {
    capacity: usize,
    next_id: u64,
    active: HashMap<WorkerId, Entry>,
    /// Reclaimed workers keep their final status here until `forget`.
    finished: HashMap<WorkerId, WorkerStatus>,
}

impl Registry {
    /// Moves every exited worker from `active` to `finished`.
    fn sweep(&mut self) -> Vec<WorkerId> {
        let done: Vec<(WorkerId, WorkerStatus)> = self
            .active
            .iter_mut()
            .filter_map(|(id, e)| e.handle.try_outcome().map(|o| (*id, o.into())))
            .collect();
        for (id, status) in &done {
            self.retire(*id, *status);
        }
        done.into_iter().map(|(id, _)| id).collect()
    }

    fn retire(&mut self, id: WorkerId, status: WorkerStatus) {
        if let Some(e) = self.active.remove(&id) {
            tracing::debug!(worker = %id, job = e.job_id, handle = %e.handle.describe(), ?status, "worker reclaimed");
            self.finished.insert(id, status);
        }
    }
}

/// A successful admission: the worker's id and the consumer end of its
/// progress channel.
pub struct Submission {
    pub worker_id: WorkerId,
    pub events: ProgressReceiver,
}

pub struct JobWorkerPool {
    launcher: Arc<dyn Launcher>,
    registry: Mutex<Registry>,
    grace: Duration,
    span: Span,
}

impl JobWorkerPool {
    pub fn new(launcher: Arc<dyn Launcher>, capacity: usize, grace: Duration) -> Self {
        Self {
            launcher,
            registry: Mutex::new(Registry {
                capacity: capacity.max(1),
                next_id: 1,
                active: HashMap::new(),
                finished: HashMap::new(),
            }),
            grace,
            span: Span::current(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn capacity(&self) -> usize {
        self.registry.lock().unwrap().capacity
    }

    /// Takes effect for the next `submit`; running workers are never evicted.
    pub fn set_capacity(&self, capacity: usize) {
        let capacity = capacity.max(1);
        self.registry.lock().unwrap().capacity = capacity;
        tracing::info!(parent: &self.span, capacity, "pool capacity changed");
    }

    pub fn active_count(&self) -> usize {
        self.registry.lock().unwrap().active.len()
    }

    /// Starts `spec` if a slot is free. Never blocks on the worker itself.
    pub fn submit(&self, spec: JobSpec) -> Result<Submission, PoolError> {
        let _g = self.span.enter();
        let mut reg = self.registry.lock().unwrap();
        reg.sweep();
        if reg.active.len() >= reg.capacity {
            return Err(PoolError::Full {
                capacity: reg.capacity,
            });
        }

        let cancel = CancelSignal::new();
        let (tx, rx) = progress_channel();
        let job_id = spec.job_id;
        let handle = self
            .launcher
            .launch(spec, tx, cancel.clone())
            .map_err(PoolError::Spawn)?;

        let id = WorkerId(reg.next_id);
        reg.next_id += 1;
        tracing::info!(worker = %id, job = job_id, handle = %handle.describe(), "worker started");
        reg.active.insert(id, Entry { job_id, handle, cancel });
        Ok(Submission {
            worker_id: id,
            events: rx,
        })
    }

    /// Asks the worker to stop, waits up to the grace period, then forces it.
    /// Returns false if `id` is not an active worker.
    pub fn cancel(&self, id: WorkerId) -> bool {
        let _g = self.span.enter();
        {
            let mut reg = self.registry.lock().unwrap();
            let Some(entry) = reg.active.get_mut(&id) else {
                return false;
            };
            entry.cancel.cancel();
            entry.handle.request_cancel();
            tracing::debug!(worker = %id, job = entry.job_id, "cancel requested");
        }

        if self.wait_exit(id, self.grace).is_none() {
            let mut guard = self.registry.lock().unwrap();
            let reg = &mut *guard;
            if let Some(entry) = reg.active.get_mut(&id) {
                tracing::warn!(worker = %id, "worker ignored cancel for {:?}; forcing", self.grace);
                entry.handle.kill();
                reg.retire(id, WorkerStatus::Cancelled);
            }
        }
        true
    }

    /// Current status. Exited-but-unreclaimed workers already report their outcome.
    pub fn status(&self, id: WorkerId) -> WorkerStatus {
        let mut reg = self.registry.lock().unwrap();
        if let Some(entry) = reg.active.get_mut(&id) {
            return entry
                .handle
                .try_outcome()
                .map(WorkerStatus::from)
                .unwrap_or(WorkerStatus::Running);
        }
        reg.finished.get(&id).copied().unwrap_or(WorkerStatus::NotFound)
    }

    /// Frees the slots of all exited workers; returns their ids.
    pub fn reclaim_finished(&self) -> Vec<WorkerId> {
        self.registry.lock().unwrap().sweep()
    }

    /// Waits up to `wait` for `id` to exit and reclaims it. `None` if it is
    /// still running afterwards (it stays registered).
    pub fn reclaim(&self, id: WorkerId, wait: Duration) -> Option<WorkerStatus> {
        self.wait_exit(id, wait)
    }

    /// Drops the remembered status of a reclaimed worker.
    pub fn forget(&self, id: WorkerId) {
        self.registry.lock().unwrap().finished.remove(&id);
    }

    /// Cancels every active worker and returns once all are reclaimed or killed.
    pub fn shutdown(&self) {
        let _g = self.span.enter();
        let ids: Vec<WorkerId> = {
            let mut reg = self.registry.lock().unwrap();
            for entry in reg.active.values_mut() {
                entry.cancel.cancel();
                entry.handle.request_cancel();
            }
            reg.active.keys().copied().collect()
        };
        if ids.is_empty() {
            return;
        }
        tracing::info!(workers = ids.len(), "shutting down worker pool");

        let deadline = Instant::now() + self.grace;
        for id in &ids {
            let left = deadline.saturating_duration_since(Instant::now());
            self.wait_exit(*id, left);
        }
        let mut guard = self.registry.lock().unwrap();
        let reg = &mut *guard;
        for id in ids {
            if let Some(entry) = reg.active.get_mut(&id) {
                entry.handle.kill();
                reg.retire(id, WorkerStatus::Cancelled);
            }
        }
    }

    /// Polls (lock released between polls) until `id` exits or `wait` runs out;
    /// an exited worker is retired. `None` while it is still running.
    fn wait_exit(&self, id: WorkerId, wait: Duration) -> Option<WorkerStatus> {
        let deadline = Instant::now() + wait;
        loop {
            {
                let mut guard = self.registry.lock().unwrap();
                let reg = &mut *guard;
                match reg.active.get_mut(&id) {
                    None => return reg.finished.get(&id).copied(),
                    Some(entry) => {
                        if let Some(outcome) = entry.handle.try_outcome() {
                            let status = WorkerStatus::from(outcome);
                            reg.retire(id, status);
                            return Some(status);
                        }
                    }
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(EXIT_POLL);
        }
    }
}

#[cfg(test)]
mod tests;
