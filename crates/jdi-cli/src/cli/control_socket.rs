//! Control socket: server (during `jdi get`) and client (`jdi cancel`,
//! `jdi capacity`, `jdi threads`).
//! Protocol: one line per command: "cancel <id>", "capacity <n>" or "threads <n>".

use anyhow::{Context, Result};
use jdi_core::DownloadOrchestrator;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Cancel(u64),
    Capacity(usize),
    Threads(usize),
}

impl ControlCommand {
    /// Parses one protocol line. `None` for anything malformed.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (verb, arg) = line.trim().split_once(char::is_whitespace)?;
        let arg = arg.trim();
        match verb {
            "cancel" => arg.parse().ok().map(ControlCommand::Cancel),
            "capacity" => arg.parse().ok().filter(|&n| n > 0).map(ControlCommand::Capacity),
            "threads" => arg.parse().ok().filter(|&n| n > 0).map(ControlCommand::Threads),
            _ => None,
        }
    }

    pub fn to_line(self) -> String {
        match self {
            ControlCommand::Cancel(id) => format!("cancel {id}\n"),
            ControlCommand::Capacity(n) => format!("capacity {n}\n"),
            ControlCommand::Threads(n) => format!("threads {n}\n"),
        }
    }

    /// Orchestrator calls can block (cancel waits out the grace period), so
    /// they run on the blocking pool.
    fn apply(self, orch: &DownloadOrchestrator) {
        match self {
            ControlCommand::Cancel(id) => {
                if !orch.cancel(id) {
                    tracing::info!(job = id, "cancel ignored: no such live job");
                }
            }
            ControlCommand::Capacity(n) => orch.set_capacity(n),
            ControlCommand::Threads(n) => orch.set_thread_count(n),
        }
    }
}

/// Spawns a task that listens on `path` and applies each well-formed command
/// line to `orch`. Ignores malformed lines.
pub fn spawn_control_listener(
    orch: Arc<DownloadOrchestrator>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).with_context(|| format!("binding {}", path.display()))?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let orch = Arc::clone(&orch);
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            let Some(cmd) = ControlCommand::parse_line(&line) else {
                                tracing::debug!(line = %line.trim(), "control socket: malformed line");
                                continue;
                            };
                            tracing::info!(?cmd, "control command");
                            let orch = Arc::clone(&orch);
                            let _ = tokio::task::spawn_blocking(move || cmd.apply(&orch)).await;
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

/// Sends one command line to the running `jdi get`.
pub async fn send_command(socket_path: &Path, cmd: ControlCommand) -> Result<()> {
    if !socket_path.exists() {
        anyhow::bail!("no running `jdi get` (missing {})", socket_path.display());
    }
    let mut stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("connecting to {}", socket_path.display()))?;
    stream.write_all(cmd.to_line().as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
