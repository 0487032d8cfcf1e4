//! Integration tests: the orchestrator driving in-process workers against a
//! local range server.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use common::range_server::{self, RangeServerOptions};
use jdi_core::credentials::{CookieFileProvider, CredentialProvider, NoCredentials};
use jdi_core::media::YtDlp;
use jdi_core::orchestrator::{HeadProbe, RecordingSink};
use jdi_core::worker::{DownloadRunner, JobSettings, ThreadLauncher};
use jdi_core::{DownloadOrchestrator, JobState, OrchestratorOptions, ProgressEvent, Services, SubmitRequest};
use tempfile::tempdir;

fn orchestrator(capacity: usize, dir: &std::path::Path, sink: Arc<RecordingSink>) -> DownloadOrchestrator {
    orchestrator_with(capacity, dir, sink, Arc::new(NoCredentials))
}

fn orchestrator_with(
    capacity: usize,
    dir: &std::path::Path,
    sink: Arc<RecordingSink>,
    credentials: Arc<dyn CredentialProvider>,
) -> DownloadOrchestrator {
    let mut settings = JobSettings::default();
    settings.min_chunk_size = 64 * 1024;
    DownloadOrchestrator::new(
        OrchestratorOptions {
            capacity,
            cancel_grace: Duration::from_millis(500),
            progress_interval: Duration::from_millis(50),
            pending_poll: Duration::from_millis(100),
            validate_urls: true,
            download_dir: dir.to_path_buf(),
            settings,
        },
        Services {
            launcher: Arc::new(ThreadLauncher::new(Arc::new(DownloadRunner::default()))),
            extractor: Arc::new(YtDlp::new("yt-dlp")),
            credentials,
            probe: Arc::new(HeadProbe),
            sink,
        },
    )
}

#[test]
fn excess_jobs_wait_then_all_complete_with_unique_names() {
    let data: Vec<u8> = (0u8..=255).cycle().take(512 * 1024).collect();
    let server = range_server::start_with_options(
        data.clone(),
        RangeServerOptions {
            throttle: Some(Duration::from_millis(20)),
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(1, dir.path(), Arc::clone(&sink));

    let url = server.url("data.bin");
    let report = orch.submit(&[url.as_str(), url.as_str()], &SubmitRequest::default());
    assert_eq!(report.accepted.len(), 2);
    let states: Vec<JobState> = orch.jobs().iter().map(|j| j.state).collect();
    assert_eq!(states, vec![JobState::Running, JobState::Pending]);

    assert!(orch.wait_idle(Some(Duration::from_secs(30))));
    let jobs = orch.jobs();
    assert!(jobs.iter().all(|j| j.state == JobState::Completed), "{jobs:?}");

    let names: BTreeSet<String> = jobs
        .iter()
        .flat_map(|j| j.result_paths.iter())
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, BTreeSet::from(["data.bin".to_string(), "data (1).bin".to_string()]));
    for j in &jobs {
        assert_eq!(std::fs::read(&j.result_paths[0]).unwrap(), data);
        let events = sink.events_for(j.id);
        assert!(matches!(events.last(), Some(ProgressEvent::Completed { .. })));
    }
}

#[test]
fn unreachable_url_is_rejected_before_queueing() {
    // A port nothing listens on any more.
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let dead = format!("http://127.0.0.1:{port}/gone.bin");

    let server = range_server::start_with_options(
        vec![1; 10],
        RangeServerOptions {
            head_allowed: false,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let orch = orchestrator(2, dir.path(), Arc::new(RecordingSink::default()));
    let report = orch.submit(&[dead.clone(), server.url("headless.bin")], &SubmitRequest::default());

    // A server that refuses HEAD still passes through a one-byte GET.
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.invalid.len(), 1);
    assert_eq!(report.invalid[0].url, dead);
    assert!(orch.wait_idle(Some(Duration::from_secs(10))));
    assert_eq!(orch.jobs()[0].state, JobState::Completed);
}

#[test]
fn cancelling_a_running_download_cleans_up() {
    let server = range_server::start_with_options(
        vec![7; 4 * 1024 * 1024],
        RangeServerOptions {
            throttle: Some(Duration::from_millis(20)),
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(1, dir.path(), Arc::clone(&sink));
    let id = orch.submit(&[server.url("slow.bin")], &SubmitRequest::default()).accepted[0];

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while !sink
        .events_for(id)
        .iter()
        .any(|e| matches!(e, ProgressEvent::Progress { bytes_done, .. } if *bytes_done > 0))
    {
        assert!(std::time::Instant::now() < deadline, "download never started");
        std::thread::sleep(Duration::from_millis(20));
    }

    assert!(orch.cancel(id));
    assert!(orch.wait_idle(Some(Duration::from_secs(10))));
    assert_eq!(orch.job(id).unwrap().state, JobState::Cancelled);
    assert_eq!(sink.events_for(id).last(), Some(&ProgressEvent::Cancelled));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn cookie_protected_file_is_admitted_and_downloaded() {
    let data: Vec<u8> = (0u8..=255).cycle().take(200 * 1024).collect();
    let server = range_server::start_with_options(
        data.clone(),
        RangeServerOptions {
            required_cookie: Some("sid=1"),
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let cookies = dir.path().join("cookies.txt");
    std::fs::write(&cookies, "# Netscape HTTP Cookie File\n127.0.0.1\tFALSE\t/\tFALSE\t0\tsid\t1\n").unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator_with(1, &out, Arc::clone(&sink), Arc::new(CookieFileProvider::new(&cookies)));
    let report = orch.submit(&[server.url("secret.bin")], &SubmitRequest::default());
    assert!(report.invalid.is_empty(), "{:?}", report.invalid);
    assert!(orch.wait_idle(Some(Duration::from_secs(30))));
    let job = orch.job(report.accepted[0]).unwrap();
    assert_eq!(job.state, JobState::Completed, "{:?}", job.error);
    assert_eq!(std::fs::read(&job.result_paths[0]).unwrap(), data);

    let orch = orchestrator(1, &out, Arc::new(RecordingSink::default()));
    let report = orch.submit(&[server.url("secret.bin")], &SubmitRequest::default());
    assert!(report.accepted.is_empty());
    assert_eq!(report.invalid.len(), 1);
}
