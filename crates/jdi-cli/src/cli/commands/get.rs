//! `jdi get` – run the orchestrator over the given URLs until every job ends.

use anyhow::{Context, Result};
use jdi_core::config::{JdiConfig, WorkerIsolation};
use jdi_core::credentials::{CookieFileProvider, CredentialProvider, NoCredentials};
use jdi_core::media::{MediaExtractor, YtDlp};
use jdi_core::orchestrator::{HeadProbe, Services};
use jdi_core::pipeline::MediaRequest;
use jdi_core::worker::{DownloadRunner, Launcher, ProcessLauncher, ThreadLauncher};
use jdi_core::{DownloadOrchestrator, JobState, OrchestratorOptions, SubmitRequest};
use std::sync::Arc;

use crate::cli::control_socket;
use crate::cli::progress::TerminalSink;
use crate::cli::GetArgs;

pub async fn run_get(mut cfg: JdiConfig, args: GetArgs) -> Result<i32> {
    apply_overrides(&mut cfg, &args);
    let request = SubmitRequest {
        destination: args.dest.clone(),
        audio_only: args.audio_only,
        media: Some(media_request(&cfg, &args)),
    };

    let orch = Arc::new(build_orchestrator(&cfg)?);

    let socket_path = jdi_core::control::default_control_socket_path().ok();
    let listener = match &socket_path {
        Some(path) => match control_socket::spawn_control_listener(Arc::clone(&orch), path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!("control socket unavailable: {e:#}");
                None
            }
        },
        None => None,
    };

    let report = {
        let orch = Arc::clone(&orch);
        let urls = args.urls.clone();
        tokio::task::spawn_blocking(move || orch.submit(&urls, &request)).await?
    };
    for bad in &report.invalid {
        eprintln!("skipped {}: {}", bad.url, bad.reason);
    }
    if !report.accepted.is_empty() {
        println!(
            "queued {} job(s): {}",
            report.accepted.len(),
            report.accepted.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
        );
    }

    let idle = {
        let orch = Arc::clone(&orch);
        tokio::task::spawn_blocking(move || orch.wait_idle(None))
    };
    tokio::select! {
        res = idle => { res?; }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted; cancelling all jobs");
            let orch = Arc::clone(&orch);
            tokio::task::spawn_blocking(move || {
                orch.cancel_all();
                orch.wait_idle(None);
            })
            .await?;
        }
    }

    if let Some(handle) = listener {
        handle.abort();
    }
    if let Some(path) = &socket_path {
        let _ = std::fs::remove_file(path);
    }

    let jobs = orch.jobs();
    {
        let orch = Arc::clone(&orch);
        tokio::task::spawn_blocking(move || orch.shutdown()).await?;
    }

    print_summary(&jobs);
    let all_ok = report.invalid.is_empty() && jobs.iter().all(|j| j.state == JobState::Completed);
    Ok(if all_ok { 0 } else { 1 })
}

fn apply_overrides(cfg: &mut JdiConfig, args: &GetArgs) {
    if let Some(n) = args.threads {
        cfg.download_threads = n as usize;
    }
    if let Some(n) = args.jobs {
        cfg.max_concurrent_downloads = n as usize;
    }
    if let Some(isolation) = args.isolation {
        cfg.worker_isolation = isolation.into();
    }
}

pub(crate) fn media_request(cfg: &JdiConfig, args: &GetArgs) -> MediaRequest {
    let mut req = cfg.media.to_request();
    if let Some(h) = args.video_quality {
        req.video_height = Some(h);
    }
    if let Some(b) = args.audio_bitrate {
        req.audio_bitrate = Some(b);
    }
    if args.no_video {
        req.video = false;
    }
    if args.no_audio {
        req.audio = false;
    }
    if args.no_mux {
        req.mux = false;
    }
    req
}

fn build_orchestrator(cfg: &JdiConfig) -> Result<DownloadOrchestrator> {
    let launcher: Arc<dyn Launcher> = match cfg.worker_isolation {
        WorkerIsolation::Process => {
            Arc::new(ProcessLauncher::current_exe().context("locating the jdi executable for worker processes")?)
        }
        WorkerIsolation::Thread => Arc::new(ThreadLauncher::new(Arc::new(DownloadRunner::default()))),
    };
    let extractor: Arc<dyn MediaExtractor> = Arc::new(
        YtDlp::new(&cfg.tools.ytdlp)
            .with_cookie_file(cfg.cookies_file.clone())
            .with_grace(cfg.cancel_grace()),
    );
    let credentials: Arc<dyn CredentialProvider> = match &cfg.cookies_file {
        Some(path) => Arc::new(CookieFileProvider::new(path)),
        None => Arc::new(NoCredentials),
    };
    Ok(DownloadOrchestrator::new(
        OrchestratorOptions::from_config(cfg),
        Services {
            launcher,
            extractor,
            credentials,
            probe: Arc::new(HeadProbe),
            sink: Arc::new(TerminalSink::default()),
        },
    ))
}

fn print_summary(jobs: &[jdi_core::JobSnapshot]) {
    if jobs.is_empty() {
        println!("Nothing to download.");
        return;
    }
    println!("{:<6} {:<10} {}", "ID", "STATE", "RESULT");
    for j in jobs {
        let result = match j.state {
            JobState::Completed => j
                .result_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            JobState::Failed => j.error.clone().unwrap_or_default(),
            _ => j.source_url.clone(),
        };
        println!("{:<6} {:<10} {}", j.id, j.state.to_string(), result);
    }
}
