//! Integration tests: plain-file downloads against a local range server.

mod common;

use std::path::Path;
use std::time::Duration;

use common::range_server::{self, RangeServerOptions};
use jdi_core::downloader::{ChunkedTransferEngine, TransferOptions};
use jdi_core::progress::{progress_channel, ProgressEvent, ProgressReceiver};
use jdi_core::retry::RetryPolicy;
use jdi_core::storage::is_temp_file_name;
use jdi_core::worker::{execute, DownloadRunner, JobKind, JobOutcome, JobSettings, JobSpec};
use jdi_core::{CancelSignal, DownloadError};
use tempfile::tempdir;

const MIB: u64 = 1024 * 1024;

fn body(len: u64) -> Vec<u8> {
    (0u8..251).cycle().take(len as usize).collect()
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn drain(rx: &ProgressReceiver) -> Vec<ProgressEvent> {
    rx.try_iter().collect()
}

#[test]
fn ten_mib_in_four_chunks_is_byte_identical() {
    let data = body(10 * MIB);
    let server = range_server::start(data.clone());
    let dir = tempdir().unwrap();

    let mut settings = JobSettings::default();
    settings.thread_count = 4;
    settings.min_chunk_size = MIB;
    let spec = JobSpec {
        job_id: 1,
        kind: JobKind::PlainFile,
        url: server.url("data.bin"),
        destination_folder: dir.path().to_path_buf(),
        settings,
    };
    let (tx, rx) = progress_channel();
    let outcome = execute(&DownloadRunner::default(), &spec, &tx, &CancelSignal::new());
    assert_eq!(outcome, JobOutcome::Completed);

    let chunk = 10 * MIB / 4;
    let expected: Vec<Option<(u64, u64)>> = (0..4).map(|i| Some((i * chunk, (i + 1) * chunk - 1))).collect();
    assert_eq!(server.get_ranges(), expected);

    let events = drain(&rx);
    let Some(ProgressEvent::Completed { result_paths }) = events.last() else {
        panic!("last event should be Completed: {events:?}");
    };
    assert_eq!(result_paths, &vec![dir.path().join("data.bin")]);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.contains(&ProgressEvent::status("Connecting...")));
    assert!(events.contains(&ProgressEvent::status("Downloading...")));

    assert_eq!(std::fs::read(&result_paths[0]).unwrap(), data);
    assert_eq!(entries(dir.path()), vec!["data.bin"]);
}

#[test]
fn server_without_ranges_gets_a_single_stream() {
    let data = body(3 * MIB);
    let server = range_server::start_with_options(
        data.clone(),
        RangeServerOptions {
            support_ranges: false,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let (tx, _rx) = progress_channel();
    let engine = ChunkedTransferEngine::new(TransferOptions::default());
    let path = engine
        .download(&server.url("plain.iso"), dir.path(), &tx, &CancelSignal::new())
        .unwrap();

    assert_eq!(server.get_ranges(), vec![None]);
    assert_eq!(std::fs::read(&path).unwrap(), data);
    assert_eq!(entries(dir.path()), vec!["plain.iso"]);
}

#[test]
fn blocked_head_falls_back_to_single_stream() {
    let data = body(256 * 1024);
    let server = range_server::start_with_options(
        data.clone(),
        RangeServerOptions {
            head_allowed: false,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let (tx, _rx) = progress_channel();
    let path = ChunkedTransferEngine::new(TransferOptions::default())
        .download(&server.url("nohead.bin"), dir.path(), &tx, &CancelSignal::new())
        .unwrap();
    assert_eq!(server.get_ranges(), vec![None]);
    assert_eq!(std::fs::read(path).unwrap(), data);
}

#[test]
fn existing_file_is_never_overwritten() {
    let data = body(64 * 1024);
    let server = range_server::start(data.clone());
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("video.mp4"), b"old").unwrap();

    let (tx, _rx) = progress_channel();
    let engine = ChunkedTransferEngine::new(TransferOptions::default());
    let first = engine
        .download(&server.url("video.mp4"), dir.path(), &tx, &CancelSignal::new())
        .unwrap();
    let second = engine
        .download(&server.url("video.mp4"), dir.path(), &tx, &CancelSignal::new())
        .unwrap();

    assert_eq!(first, dir.path().join("video (1).mp4"));
    assert_eq!(second, dir.path().join("video (2).mp4"));
    assert_eq!(std::fs::read(dir.path().join("video.mp4")).unwrap(), b"old");
    assert_eq!(std::fs::read(second).unwrap(), data);
}

#[test]
fn cancel_mid_transfer_leaves_no_temp_files() {
    let server = range_server::start_with_options(
        body(8 * MIB),
        RangeServerOptions {
            throttle: Some(Duration::from_millis(20)),
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let cancel = CancelSignal::new();
    let (tx, rx) = progress_channel();
    let options = TransferOptions {
        min_chunk_size: MIB,
        retry: RetryPolicy::none(),
        ..TransferOptions::default()
    };

    let result = std::thread::scope(|s| {
        let worker = s.spawn(|| {
            ChunkedTransferEngine::new(options).download(&server.url("big.bin"), dir.path(), &tx, &cancel)
        });
        // Wait until bytes are flowing, then pull the plug.
        loop {
            match rx.recv_timeout(Duration::from_secs(10)) {
                Ok(ProgressEvent::Progress { bytes_done, .. }) if bytes_done > 0 => break,
                Ok(_) => {}
                Err(e) => panic!("no progress before cancel: {e}"),
            }
        }
        cancel.cancel();
        worker.join().unwrap()
    });

    assert!(matches!(result, Err(DownloadError::Cancelled)), "{result:?}");
    let leftovers = entries(dir.path());
    assert!(leftovers.iter().all(|n| !is_temp_file_name(n)), "{leftovers:?}");
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn cancel_before_start_touches_nothing() {
    let server = range_server::start(body(1024));
    let dir = tempdir().unwrap();
    let cancel = CancelSignal::new();
    cancel.cancel();
    let (tx, rx) = progress_channel();
    let result = ChunkedTransferEngine::new(TransferOptions::default()).download(
        &server.url("x.bin"),
        dir.path(),
        &tx,
        &cancel,
    );
    assert!(matches!(result, Err(DownloadError::Cancelled)));
    assert!(drain(&rx).is_empty());
    assert!(server.get_ranges().is_empty());
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn http_error_fails_the_job_with_its_message() {
    let dir = tempdir().unwrap();
    let spec = JobSpec {
        job_id: 9,
        kind: JobKind::PlainFile,
        url: "http://127.0.0.1:9/unreachable.bin".into(),
        destination_folder: dir.path().to_path_buf(),
        settings: JobSettings {
            retry: jdi_core::config::RetryConfig {
                max_attempts: 1,
                ..Default::default()
            },
            ..JobSettings::default()
        },
    };
    let (tx, rx) = progress_channel();
    let outcome = execute(&DownloadRunner::default(), &spec, &tx, &CancelSignal::new());
    assert_eq!(outcome, JobOutcome::Failed);
    match drain(&rx).last() {
        Some(ProgressEvent::Error { message }) => assert!(!message.is_empty()),
        other => panic!("expected Error, got {other:?}"),
    }
    assert!(entries(dir.path()).is_empty());
}
