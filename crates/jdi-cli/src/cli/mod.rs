//! CLI for the JDI download manager.

mod commands;
mod control_socket;
mod progress;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use jdi_core::config::{self, WorkerIsolation};
use jdi_core::media::{parse_audio_quality, parse_video_quality};
use std::path::PathBuf;

use commands::{run_completions, run_control, run_formats, run_get, run_worker};
use control_socket::ControlCommand;

/// Top-level CLI for the JDI download manager.
#[derive(Debug, Parser)]
#[command(name = "jdi")]
#[command(about = "JDI: concurrent file and media download manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs and wait until every job has finished.
    Get(GetArgs),

    /// Cancel a job of the running `jdi get`.
    Cancel {
        /// Job identifier, as printed by `jdi get`.
        id: u64,
    },

    /// Change how many jobs the running `jdi get` runs at once.
    Capacity {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        n: u64,
    },

    /// Change the connection count for plain-file jobs started from now on.
    Threads {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        n: u64,
    },

    /// List the media formats offered for a URL.
    Formats {
        url: String,
    },

    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Worker-process entry point: job spec on stdin, events on stdout.
    #[command(hide = true)]
    Worker,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// HTTP/HTTPS URLs: plain files, YouTube videos or playlists.
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Destination folder (default: configured download_dir).
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Connections per plain-file download.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub threads: Option<u64>,

    /// Jobs running at once.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub jobs: Option<u64>,

    /// Target video height, e.g. 1080p.
    #[arg(long, value_name = "LABEL", value_parser = video_quality)]
    pub video_quality: Option<u32>,

    /// Target audio bitrate in kbit/s, or a preset such as "High (m4a)".
    #[arg(long, value_name = "KBPS", value_parser = audio_quality)]
    pub audio_bitrate: Option<u32>,

    /// Media URLs: download only the audio stream.
    #[arg(long, conflicts_with_all = ["no_audio", "no_video"])]
    pub audio_only: bool,

    #[arg(long)]
    pub no_video: bool,

    #[arg(long)]
    pub no_audio: bool,

    /// Keep video and audio as separate files.
    #[arg(long)]
    pub no_mux: bool,

    /// Run each job in its own process or in a thread of this one.
    #[arg(long, value_enum)]
    pub isolation: Option<Isolation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Isolation {
    Process,
    Thread,
}

impl From<Isolation> for WorkerIsolation {
    fn from(i: Isolation) -> Self {
        match i {
            Isolation::Process => WorkerIsolation::Process,
            Isolation::Thread => WorkerIsolation::Thread,
        }
    }
}

fn video_quality(s: &str) -> Result<u32, String> {
    parse_video_quality(s).ok_or_else(|| format!("not a video quality: {s:?} (try 720p)"))
}

fn audio_quality(s: &str) -> Result<u32, String> {
    parse_audio_quality(s).ok_or_else(|| format!("not an audio bitrate: {s:?} (try 128)"))
}

impl CliCommand {
    /// Parses the command line and runs it; returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Get(args) => run_get(load_config()?, args).await,
            CliCommand::Cancel { id } => run_control(ControlCommand::Cancel(id)).await.map(|_| 0),
            CliCommand::Capacity { n } => run_control(ControlCommand::Capacity(n as usize)).await.map(|_| 0),
            CliCommand::Threads { n } => run_control(ControlCommand::Threads(n as usize)).await.map(|_| 0),
            CliCommand::Formats { url } => run_formats(&load_config()?, &url).await.map(|_| 0),
            CliCommand::Completions { shell } => {
                run_completions(shell);
                Ok(0)
            }
            // Settings arrive in the job spec; the config file is not read.
            CliCommand::Worker => Ok(run_worker()),
        }
    }
}

fn load_config() -> Result<config::JdiConfig> {
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
