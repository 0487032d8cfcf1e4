//! Job admission, the pending queue, and the per-job monitors.
//!
//! The orchestrator owns every `JobRecord`. Jobs move
//! Pending -> Running -> {Completed, Failed, Cancelled}; a job can also go
//! straight from Pending to Cancelled. One monitor thread per running job
//! drains that job's progress channel and is the only writer of its terminal
//! state.
//!
//! Lock order is book, then the pool registry. The book lock is never held
//! while waiting for a worker.

mod admission;
mod monitor;
mod probe;
mod record;
mod sink;

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::Span;

use crate::config::JdiConfig;
use crate::control::CancelSignal;
use crate::credentials::CredentialProvider;
use crate::media::MediaExtractor;
use crate::pipeline::MediaRequest;
use crate::pool::{JobWorkerPool, PoolError, Submission};
use crate::progress::ProgressEvent;
use crate::worker::{JobSettings, Launcher};

pub use admission::{InvalidUrl, SubmitReport, SubmitRequest};
pub use probe::{HeadProbe, NoProbe, ReachabilityProbe};
pub use record::{JobSnapshot, JobState};
pub use sink::{NullSink, PresentationSink, RecordingSink};

use record::JobRecord;

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub capacity: usize,
    pub cancel_grace: Duration,
    pub progress_interval: Duration,
    pub pending_poll: Duration,
    pub validate_urls: bool,
    pub download_dir: PathBuf,
    pub settings: JobSettings,
}

impl OrchestratorOptions {
    pub fn from_config(cfg: &JdiConfig) -> Self {
        Self {
            capacity: cfg.max_concurrent_downloads.max(1),
            cancel_grace: cfg.cancel_grace(),
            progress_interval: cfg.progress_interval(),
            pending_poll: cfg.pending_poll(),
            validate_urls: cfg.validate_urls,
            download_dir: cfg.resolve_download_dir(),
            settings: JobSettings::from_config(cfg),
        }
    }
}

/// The collaborators an orchestrator talks to.
pub struct Services {
    pub launcher: Arc<dyn Launcher>,
    pub extractor: Arc<dyn MediaExtractor>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub probe: Arc<dyn ReachabilityProbe>,
    pub sink: Arc<dyn PresentationSink>,
}

struct Book {
    jobs: BTreeMap<u64, JobRecord>,
    pending: VecDeque<u64>,
    next_id: u64,
    settings: JobSettings,
}

impl Book {
    fn has_live_jobs(&self) -> bool {
        self.jobs.values().any(|j| !j.state.is_terminal())
    }
}

pub(crate) struct Shared {
    pool: JobWorkerPool,
    book: Mutex<Book>,
    idle: Condvar,
    extractor: Arc<dyn MediaExtractor>,
    credentials: Arc<dyn CredentialProvider>,
    probe: Arc<dyn ReachabilityProbe>,
    sink: Arc<dyn PresentationSink>,
    progress_interval: Duration,
    validate_urls: bool,
    download_dir: PathBuf,
    stop: CancelSignal,
    monitors: Mutex<Vec<JoinHandle<()>>>,
    span: Span,
}

pub struct DownloadOrchestrator {
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl DownloadOrchestrator {
    pub fn new(options: OrchestratorOptions, services: Services) -> Self {
        let span = tracing::info_span!("orchestrator");
        let pool = JobWorkerPool::new(services.launcher, options.capacity, options.cancel_grace).with_span(span.clone());
        let shared = Arc::new(Shared {
            pool,
            book: Mutex::new(Book {
                jobs: BTreeMap::new(),
                pending: VecDeque::new(),
                next_id: 1,
                settings: options.settings,
            }),
            idle: Condvar::new(),
            extractor: services.extractor,
            credentials: services.credentials,
            probe: services.probe,
            sink: services.sink,
            progress_interval: options.progress_interval,
            validate_urls: options.validate_urls,
            download_dir: options.download_dir,
            stop: CancelSignal::new(),
            monitors: Mutex::new(Vec::new()),
            span,
        });
        let timer = spawn_pending_timer(Arc::clone(&shared), options.pending_poll);
        Self {
            shared,
            timer: Mutex::new(timer),
        }
    }

    /// Classifies, expands, and validates `urls`, then queues one job per
    /// accepted URL. Jobs start immediately while the pool has room.
    pub fn submit<S: AsRef<str>>(&self, urls: &[S], request: &SubmitRequest) -> SubmitReport {
        let report = admission::admit(&self.shared, urls, request);
        drain_pending(&self.shared);
        report
    }

    /// Cancels a pending or running job. False for unknown or finished jobs.
    ///
    /// For a running job this blocks up to the cancel grace period; the job's
    /// monitor records the final state.
    pub fn cancel(&self, job_id: u64) -> bool {
        let _g = self.shared.span.enter();
        let worker = {
            let mut guard = self.shared.book.lock().unwrap();
            let book = &mut *guard;
            let Some(rec) = book.jobs.get_mut(&job_id) else {
                return false;
            };
            match rec.state {
                JobState::Pending => {
                    book.pending.retain(|id| *id != job_id);
                    rec.state = JobState::Cancelled;
                    None
                }
                JobState::Running => {
                    rec.cancel_requested = true;
                    rec.worker
                }
                _ => return false,
            }
        };

        match worker {
            None => {
                tracing::info!(job = job_id, "pending job cancelled");
                self.shared.sink.on_event(job_id, &ProgressEvent::Cancelled);
                self.shared.idle.notify_all();
            }
            Some(w) => {
                tracing::info!(job = job_id, worker = %w, "cancelling running job");
                self.shared.pool.cancel(w);
            }
        }
        true
    }

    /// Cancels every live job.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<u64> = {
            let book = self.shared.book.lock().unwrap();
            book.jobs.values().filter(|j| !j.state.is_terminal()).map(|j| j.id).collect()
        };
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    /// Changes the pool's capacity and starts whatever now fits.
    pub fn set_capacity(&self, capacity: usize) {
        self.shared.pool.set_capacity(capacity);
        drain_pending(&self.shared);
    }

    pub fn capacity(&self) -> usize {
        self.shared.pool.capacity()
    }

    /// Applies to jobs started from now on.
    pub fn set_thread_count(&self, threads: usize) {
        let threads = threads.max(1);
        self.shared.book.lock().unwrap().settings.thread_count = threads;
        tracing::info!(threads, "download thread count changed");
    }

    pub fn thread_count(&self) -> usize {
        self.shared.book.lock().unwrap().settings.thread_count
    }

    pub fn default_media_request(&self) -> MediaRequest {
        self.shared.book.lock().unwrap().settings.media.clone()
    }

    /// Every known job, oldest first.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let book = self.shared.book.lock().unwrap();
        book.jobs.values().map(JobRecord::snapshot).collect()
    }

    pub fn job(&self, job_id: u64) -> Option<JobSnapshot> {
        self.shared.book.lock().unwrap().jobs.get(&job_id).map(JobRecord::snapshot)
    }

    pub fn pending_count(&self) -> usize {
        self.shared.book.lock().unwrap().pending.len()
    }

    /// Forgets finished jobs; returns how many were dropped.
    pub fn clear_finished(&self) -> usize {
        let mut book = self.shared.book.lock().unwrap();
        let before = book.jobs.len();
        book.jobs.retain(|_, j| !j.state.is_terminal());
        before - book.jobs.len()
    }

    /// Blocks until no job is pending or running. With a timeout, returns
    /// false if jobs were still live when it ran out.
    pub fn wait_idle(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut book = self.shared.book.lock().unwrap();
        while book.has_live_jobs() {
            let wait = match deadline {
                Some(d) => {
                    let left = d.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return false;
                    }
                    left.min(Duration::from_millis(250))
                }
                None => Duration::from_millis(250),
            };
            book = self.shared.idle.wait_timeout(book, wait).unwrap().0;
        }
        true
    }

    /// Cancels pending jobs, stops every worker, and waits for the monitors.
    pub fn shutdown(&self) {
        if self.shared.stop.is_cancelled() {
            return;
        }
        let _g = self.shared.span.enter();
        tracing::info!("orchestrator shutting down");
        self.shared.stop.cancel();
        if let Some(timer) = self.timer.lock().unwrap().take() {
            let _ = timer.join();
        }

        let dropped: Vec<u64> = {
            let mut guard = self.shared.book.lock().unwrap();
            let book = &mut *guard;
            // Includes jobs admitted but not yet queued.
            book.pending.clear();
            let ids: Vec<u64> = book
                .jobs
                .values()
                .filter(|j| j.state == JobState::Pending)
                .map(|j| j.id)
                .collect();
            for id in &ids {
                if let Some(rec) = book.jobs.get_mut(id) {
                    rec.state = JobState::Cancelled;
                }
            }
            for rec in book.jobs.values_mut().filter(|j| j.state == JobState::Running) {
                rec.cancel_requested = true;
            }
            ids
        };
        for id in dropped {
            self.shared.sink.on_event(id, &ProgressEvent::Cancelled);
        }

        self.shared.pool.shutdown();
        let monitors: Vec<JoinHandle<()>> = self.shared.monitors.lock().unwrap().drain(..).collect();
        for m in monitors {
            let _ = m.join();
        }
        self.shared.idle.notify_all();
    }
}

impl Drop for DownloadOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_pending_timer(shared: Arc<Shared>, poll: Duration) -> Option<JoinHandle<()>> {
    let spawned = std::thread::Builder::new().name("jdi-pending".into()).spawn(move || {
        while shared.stop.sleep(poll) {
            let waiting = !shared.book.lock().unwrap().pending.is_empty();
            if waiting {
                drain_pending(&shared);
            }
        }
    });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!("failed to start pending-queue timer: {e}");
            None
        }
    }
}

/// Starts pending jobs, oldest first, until the pool reports it is full.
pub(crate) fn drain_pending(shared: &Arc<Shared>) {
    let _g = shared.span.enter();
    let mut failed: Vec<(u64, String)> = Vec::new();
    let mut orphaned = Vec::new();
    {
        let mut guard = shared.book.lock().unwrap();
        let book = &mut *guard;
        if shared.stop.is_cancelled() {
            return;
        }
        while let Some(&job_id) = book.pending.front() {
            let Some(rec) = book.jobs.get_mut(&job_id) else {
                book.pending.pop_front();
                continue;
            };
            match shared.pool.submit(rec.to_spec(&book.settings)) {
                Ok(Submission { worker_id, events }) => {
                    book.pending.pop_front();
                    rec.state = JobState::Running;
                    rec.worker = Some(worker_id);
                    let monitor_shared = Arc::clone(shared);
                    let spawned = std::thread::Builder::new()
                        .name(format!("jdi-monitor-{job_id}"))
                        .spawn(move || monitor::watch(monitor_shared, job_id, worker_id, events));
                    match spawned {
                        Ok(handle) => {
                            let mut monitors = shared.monitors.lock().unwrap();
                            monitors.retain(|m| !m.is_finished());
                            monitors.push(handle);
                        }
                        Err(e) => {
                            rec.state = JobState::Failed;
                            rec.error = Some(format!("failed to monitor worker: {e}"));
                            failed.push((job_id, format!("failed to monitor worker: {e}")));
                            orphaned.push(worker_id);
                        }
                    }
                }
                Err(PoolError::Full { capacity }) => {
                    tracing::debug!(capacity, queued = book.pending.len(), "pool full; jobs stay pending");
                    break;
                }
                Err(PoolError::Spawn(e)) => {
                    book.pending.pop_front();
                    let message = format!("failed to start worker: {e}");
                    tracing::error!(job = job_id, "{message}");
                    rec.state = JobState::Failed;
                    rec.error = Some(message.clone());
                    failed.push((job_id, message));
                }
            }
        }
    }

    for worker in orphaned {
        shared.pool.cancel(worker);
        shared.pool.forget(worker);
    }
    if !failed.is_empty() {
        for (job_id, message) in failed {
            shared.sink.on_event(job_id, &ProgressEvent::error(message));
        }
        shared.idle.notify_all();
    }
}
