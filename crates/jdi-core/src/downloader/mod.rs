//! Chunked parallel HTTP download engine.
//!
//! Probes the URL, splits the body into byte ranges (`segmenter::ChunkPlan`),
//! fetches every range on its own thread into its own temp file, then
//! concatenates the chunks in order into the final file. Servers that do not
//! advertise ranges (or report no length) get a single-stream GET instead.

mod assemble;
mod reporter;
mod segment;
mod single;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::Span;

use crate::control::CancelSignal;
use crate::error::DownloadError;
use crate::fetch_head::{self, HeadResult};
use crate::progress::{ProgressSender, StreamKind};
use crate::retry::{RetryPolicy, TransferError};
use crate::segmenter::{ByteCounter, ChunkPlan, DEFAULT_MIN_CHUNK_SIZE};
use crate::storage;
use crate::url_model::derive_filename;

use reporter::Reporter;

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub thread_count: usize,
    pub min_chunk_size: u64,
    pub retry: RetryPolicy,
    /// Minimum spacing between `Progress` events.
    pub progress_interval: Duration,
    /// Extra request headers (e.g. `Cookie`).
    pub headers: HashMap<String, String>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            thread_count: 4,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            retry: RetryPolicy::default(),
            progress_interval: Duration::from_millis(50),
            headers: HashMap::new(),
        }
    }
}

pub struct ChunkedTransferEngine {
    options: TransferOptions,
    span: Span,
}

impl ChunkedTransferEngine {
    /// Logs go to the caller's current span unless `with_span` says otherwise.
    pub fn new(options: TransferOptions) -> Self {
        Self {
            options,
            span: Span::current(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Downloads `url` into `destination_folder` and returns the final path.
    ///
    /// Emits `Status` and `Progress` events but no terminal event; the caller
    /// maps the returned result to `Completed`, `Cancelled` or `Error`. Every
    /// temp file is gone by the time this returns, whatever the outcome.
    pub fn download(
        &self,
        url: &str,
        destination_folder: &Path,
        progress: &ProgressSender,
        cancel: &CancelSignal,
    ) -> Result<PathBuf, DownloadError> {
        let _guard = self.span.enter();
        cancel.check()?;
        progress.status("Connecting...");

        let head = match fetch_head::probe(url, &self.options.headers) {
            Ok(h) => h,
            Err(e) => {
                tracing::info!(url, error = %e, "probe failed; using single-stream download");
                HeadResult::default()
            }
        };
        cancel.check()?;

        let desired = destination_folder.join(derive_filename(url, head.content_disposition.as_deref()));
        let reporter = Reporter::new(
            progress.clone(),
            StreamKind::File,
            head.content_length.unwrap_or(0),
            self.options.progress_interval,
        );
        progress.status("Downloading...");

        let finished = match head.rangeable_size() {
            Some(size) => {
                let plan = ChunkPlan::new(size, self.options.thread_count, self.options.min_chunk_size);
                tracing::debug!(url, size, chunks = plan.chunk_count(), "chunked download");
                self.download_chunked(url, destination_folder, &plan, &reporter, cancel)?
            }
            None => {
                tracing::debug!(url, length = ?head.content_length, "single-stream download");
                single::download_single(
                    url,
                    &self.options,
                    destination_folder,
                    head.content_length.filter(|&n| n > 0),
                    &reporter,
                    cancel,
                )?
            }
        };

        // Past this point cancellation no longer applies: the data is complete.
        let path = storage::persist_unique(finished, &desired)?;
        tracing::info!(url, path = %path.display(), "download finished");
        Ok(path)
    }

    fn download_chunked(
        &self,
        url: &str,
        dir: &Path,
        plan: &ChunkPlan,
        reporter: &Reporter,
        cancel: &CancelSignal,
    ) -> Result<tempfile::TempPath, DownloadError> {
        let counter = ByteCounter::new(plan.total_size);
        // Tripped by the first failing chunk; also follows the job signal.
        let stop = cancel.child();
        let span = self.span.clone();

        let results: Vec<Result<tempfile::NamedTempFile, TransferError>> = std::thread::scope(|s| {
            let handles: Vec<_> = plan
                .ranges
                .iter()
                .enumerate()
                .map(|(index, range)| {
                    let (counter, stop, span) = (&counter, &stop, span.clone());
                    s.spawn(move || {
                        let _g = span.enter();
                        let chunk = segment::ChunkTask {
                            url,
                            options: &self.options,
                            dir,
                            index,
                            range: *range,
                            counter,
                            reporter,
                            stop,
                        };
                        let res = chunk.run();
                        if let Err(e) = &res {
                            if !matches!(e, TransferError::Cancelled) {
                                tracing::warn!(chunk = index, error = %e, "chunk failed; stopping siblings");
                            }
                            stop.cancel();
                        }
                        res
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(TransferError::Storage(std::io::Error::other("chunk thread panicked")))
                    })
                })
                .collect()
        });

        if cancel.is_cancelled() {
            // Dropping `results` deletes every chunk that did finish.
            return Err(DownloadError::Cancelled);
        }
        let mut chunks = Vec::with_capacity(results.len());
        let mut first_error: Option<TransferError> = None;
        for r in results {
            match r {
                Ok(f) => chunks.push(f),
                Err(TransferError::Cancelled) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e.into());
        }
        if chunks.len() != plan.chunk_count() {
            return Err(DownloadError::Cancelled);
        }

        reporter.finish(counter.get());
        assemble::concatenate(dir, chunks, plan.total_size, cancel)
    }
}

/// Connection settings shared by range and single-stream GETs.
pub(crate) fn configure_get(
    easy: &mut curl::easy::Easy,
    url: &str,
    headers: &HashMap<String, String>,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.fail_on_error(true)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    // Abort below 1 KiB/s for 60 s rather than with a wall-clock timeout.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    // Needed for progress_function, our stall-time cancel hook.
    easy.progress(true)?;
    if let Some(list) = fetch_head::header_list(headers)? {
        easy.http_headers(list)?;
    }
    Ok(())
}

/// Maps a failed `perform()` to a `TransferError`.
///
/// `aborted` says our own callback stopped the transfer: either cancellation
/// or a storage error recorded in `storage_err`.
pub(crate) fn perform_error(
    e: curl::Error,
    easy: &mut curl::easy::Easy,
    cancelled: bool,
    storage_err: Option<std::io::Error>,
) -> TransferError {
    if let Some(io) = storage_err {
        return TransferError::Storage(io);
    }
    if cancelled && (e.is_write_error() || e.is_aborted_by_callback()) {
        return TransferError::Cancelled;
    }
    if e.is_http_returned_error() {
        if let Ok(code) = easy.response_code() {
            return TransferError::Http(code);
        }
    }
    TransferError::Curl(e)
}
