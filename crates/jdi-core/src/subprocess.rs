//! External tool invocation with line-oriented output and cooperative
//! cancellation.
//!
//! Both output pipes are drained by reader threads that split on `\r` or
//! `\n` (progress meters rewrite lines with `\r`) and feed one channel. The
//! owner polls that channel with a 200 ms bound so a tripped cancel signal
//! is noticed promptly even when the tool is silent.

use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::control::CancelSignal;
use crate::error::DownloadError;

const POLL: Duration = Duration::from_millis(200);
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipe {
    Stdout,
    Stderr,
}

/// How a watched tool ended (when it was not cancelled).
#[derive(Debug)]
pub struct ToolExit {
    pub code: Option<i32>,
    pub success: bool,
    /// Last stderr lines, newline-joined; used in error reports.
    pub stderr_tail: String,
}

impl ToolExit {
    /// `Ok(())` on success, otherwise `ToolFailed` with the stderr tail.
    pub fn check(&self, tool: &str) -> Result<(), DownloadError> {
        if self.success {
            Ok(())
        } else {
            Err(DownloadError::ToolFailed {
                tool: tool.to_string(),
                code: self.code,
                stderr: self.stderr_tail.clone(),
            })
        }
    }
}

/// Spawns `cmd` (stdout/stderr piped, stdin closed) and feeds every output
/// line to `on_line` until the tool exits or `cancel` trips.
///
/// On cancellation the tool is stopped with `terminate` and
/// `DownloadError::Cancelled` is returned.
pub fn run_watched(
    tool: &str,
    mut cmd: Command,
    cancel: &CancelSignal,
    grace: Duration,
    mut on_line: impl FnMut(Pipe, &str),
) -> Result<ToolExit, DownloadError> {
    cancel.check()?;
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| DownloadError::from_spawn(tool, e))?;
    tracing::debug!(tool, pid = child.id(), "spawned");

    let (tx, rx) = mpsc::channel::<(Pipe, String)>();
    if let Some(out) = child.stdout.take() {
        let tx = tx.clone();
        thread::spawn(move || split_lines(out, |l| drop(tx.send((Pipe::Stdout, l)))));
    }
    if let Some(err) = child.stderr.take() {
        let tx = tx.clone();
        thread::spawn(move || split_lines(err, |l| drop(tx.send((Pipe::Stderr, l)))));
    }
    drop(tx);

    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(tool, "cancel requested; terminating");
            terminate(&mut child, grace);
            return Err(DownloadError::Cancelled);
        }
        match rx.recv_timeout(POLL) {
            Ok((pipe, line)) => {
                if pipe == Pipe::Stderr {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.clone());
                }
                on_line(pipe, &line);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    // Pipes closed; the process is exiting. Keep honouring cancel while reaping.
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            terminate(&mut child, grace);
            return Err(DownloadError::Cancelled);
        }
        thread::sleep(Duration::from_millis(20));
    };
    let stderr_tail = tail.into_iter().collect::<Vec<_>>().join("\n");
    Ok(ToolExit {
        code: status.code(),
        success: status.success(),
        stderr_tail,
    })
}

/// Runs `cmd` to completion and returns its stdout (lines rejoined with `\n`).
pub fn run_capture(
    tool: &str,
    cmd: Command,
    cancel: &CancelSignal,
    grace: Duration,
) -> Result<String, DownloadError> {
    let mut stdout = String::new();
    let exit = run_watched(tool, cmd, cancel, grace, |pipe, line| {
        if pipe == Pipe::Stdout {
            stdout.push_str(line);
            stdout.push('\n');
        }
    })?;
    exit.check(tool)?;
    Ok(stdout)
}

/// Asks the child to stop (SIGTERM on unix), waits up to `grace`, then kills.
/// Always reaps the child.
pub fn terminate(child: &mut Child, grace: Duration) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    #[cfg(unix)]
    {
        // Safety: kill(2) with a pid we own and have not yet reaped.
        unsafe {
            libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
        }
        let deadline = std::time::Instant::now() + grace;
        while std::time::Instant::now() < deadline {
            if let Ok(Some(_)) = child.try_wait() {
                return;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
    #[cfg(not(unix))]
    let _ = grace;
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "kill failed (already exited?)");
    }
    let _ = child.wait();
}

/// Splits a byte stream on `\r` and `\n`, emitting non-empty lines.
pub(crate) fn split_lines<R: Read>(reader: R, mut emit: impl FnMut(String)) {
    let mut reader = BufReader::new(reader);
    let mut buf = [0u8; 4096];
    let mut line = Vec::new();
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        for &b in &buf[..n] {
            if b == b'\r' || b == b'\n' {
                if !line.is_empty() {
                    emit(String::from_utf8_lossy(&line).into_owned());
                    line.clear();
                }
            } else {
                line.push(b);
            }
        }
    }
    if !line.is_empty() {
        emit(String::from_utf8_lossy(&line).into_owned());
    }
}
