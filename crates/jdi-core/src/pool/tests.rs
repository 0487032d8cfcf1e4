use super::*;
use crate::error::DownloadError;
use crate::progress::{ProgressEvent, ProgressSender};
use crate::worker::{JobKind, JobRunner, JobSettings, ThreadLauncher};
use std::path::PathBuf;

/// Behaviour is picked by the job URL.
struct TestRunner;

impl JobRunner for TestRunner {
    fn run(&self, spec: &JobSpec, _: &ProgressSender, cancel: &CancelSignal) -> Result<Vec<PathBuf>, DownloadError> {
        match spec.url.as_str() {
            "instant" => Ok(vec![PathBuf::from("done.bin")]),
            "block" => {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(DownloadError::Cancelled)
            }
            "stubborn" => {
                std::thread::sleep(Duration::from_secs(2));
                Ok(vec![])
            }
            _ => Err(DownloadError::InvalidUrl(spec.url.clone())),
        }
    }
}

fn pool(capacity: usize) -> JobWorkerPool {
    JobWorkerPool::new(
        Arc::new(ThreadLauncher::new(Arc::new(TestRunner))),
        capacity,
        Duration::from_millis(200),
    )
}

fn spec(id: u64, url: &str) -> JobSpec {
    JobSpec {
        job_id: id,
        kind: JobKind::PlainFile,
        url: url.to_string(),
        destination_folder: PathBuf::from("."),
        settings: JobSettings::default(),
    }
}

fn terminal(rx: &ProgressReceiver) -> ProgressEvent {
    loop {
        let ev = rx.recv_timeout(Duration::from_secs(5)).expect("terminal event");
        if ev.is_terminal() {
            return ev;
        }
    }
}

#[test]
fn rejects_when_full() {
    let p = pool(2);
    let a = p.submit(spec(1, "block")).unwrap();
    let b = p.submit(spec(2, "block")).unwrap();
    match p.submit(spec(3, "block")) {
        Err(PoolError::Full { capacity }) => assert_eq!(capacity, 2),
        other => panic!("expected Full, got {:?}", other.map(|s| s.worker_id)),
    }
    assert_eq!(p.active_count(), 2);
    assert_eq!(p.status(a.worker_id), WorkerStatus::Running);
    p.shutdown();
    assert_eq!(p.status(b.worker_id), WorkerStatus::Cancelled);
}

#[test]
fn finished_worker_frees_its_slot() {
    let p = pool(1);
    let first = p.submit(spec(1, "instant")).unwrap();
    assert!(matches!(terminal(&first.events), ProgressEvent::Completed { .. }));
    assert_eq!(p.reclaim(first.worker_id, Duration::from_secs(2)), Some(WorkerStatus::Completed));
    assert_eq!(p.active_count(), 0);
    let second = p.submit(spec(2, "instant")).unwrap();
    assert_ne!(second.worker_id, first.worker_id);
}

#[test]
fn cancel_cooperative_worker() {
    let p = pool(2);
    let sub = p.submit(spec(1, "block")).unwrap();
    assert!(p.cancel(sub.worker_id));
    assert_eq!(p.status(sub.worker_id), WorkerStatus::Cancelled);
    assert_eq!(terminal(&sub.events), ProgressEvent::Cancelled);
    assert_eq!(p.active_count(), 0);
    assert!(!p.cancel(sub.worker_id));
}

#[test]
fn cancel_forces_unresponsive_worker_after_grace() {
    let p = pool(1);
    let sub = p.submit(spec(1, "stubborn")).unwrap();
    let started = Instant::now();
    assert!(p.cancel(sub.worker_id));
    let took = started.elapsed();
    assert!(took >= Duration::from_millis(200), "{took:?}");
    assert!(took < Duration::from_millis(1500), "{took:?}");
    assert_eq!(p.status(sub.worker_id), WorkerStatus::Cancelled);
    assert_eq!(p.active_count(), 0);
}

#[test]
fn failed_job_status_and_forget() {
    let p = pool(1);
    let sub = p.submit(spec(1, "bogus")).unwrap();
    assert!(matches!(terminal(&sub.events), ProgressEvent::Error { .. }));
    assert_eq!(p.reclaim(sub.worker_id, Duration::from_secs(2)), Some(WorkerStatus::Failed));
    assert_eq!(p.status(sub.worker_id), WorkerStatus::Failed);
    p.forget(sub.worker_id);
    assert_eq!(p.status(sub.worker_id), WorkerStatus::NotFound);
    assert_eq!(p.status(WorkerId(999)), WorkerStatus::NotFound);
}

#[test]
fn capacity_can_grow_at_runtime() {
    let p = pool(1);
    p.submit(spec(1, "block")).unwrap();
    assert!(matches!(p.submit(spec(2, "block")), Err(PoolError::Full { .. })));
    p.set_capacity(2);
    assert_eq!(p.capacity(), 2);
    p.submit(spec(2, "block")).unwrap();
    p.shutdown();
    assert_eq!(p.active_count(), 0);
}

#[test]
fn reclaim_finished_sweeps_exited() {
    let p = pool(3);
    let a = p.submit(spec(1, "instant")).unwrap();
    let _b = p.submit(spec(2, "block")).unwrap();
    terminal(&a.events);
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut swept = Vec::new();
    while swept.is_empty() && Instant::now() < deadline {
        swept = p.reclaim_finished();
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(swept, vec![a.worker_id]);
    assert_eq!(p.active_count(), 1);
    p.shutdown();
}
