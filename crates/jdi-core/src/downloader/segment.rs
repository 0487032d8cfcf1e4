//! One chunk: a ranged GET into the chunk's own temp file, with retry.

use std::cell::Cell;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::reporter::Reporter;
use super::{configure_get, perform_error, TransferOptions};
use crate::control::CancelSignal;
use crate::retry::{run_with_retry, TransferError};
use crate::segmenter::{ByteCounter, ChunkRange};
use crate::storage;

pub(super) struct ChunkTask<'a> {
    pub url: &'a str,
    pub options: &'a TransferOptions,
    pub dir: &'a Path,
    pub index: usize,
    pub range: ChunkRange,
    pub counter: &'a ByteCounter,
    pub reporter: &'a Reporter,
    /// Job cancel plus sibling failure.
    pub stop: &'a CancelSignal,
}

impl ChunkTask<'_> {
    /// Fetches the range, retrying transient failures from scratch. On error
    /// the temp file is dropped (deleted) here; on success it is handed back
    /// still open for assembly.
    pub(super) fn run(&self) -> Result<NamedTempFile, TransferError> {
        let mut temp = storage::create_temp(self.dir, &format!("chunk{}", self.index))
            .map_err(TransferError::Storage)?;
        // Bytes the previous attempt added to the shared counter.
        let counted = Cell::new(0u64);

        run_with_retry(&self.options.retry, self.stop, |attempt| {
            if attempt > 1 {
                self.counter.rollback(counted.replace(0));
                let f = temp.as_file_mut();
                f.set_len(0).map_err(TransferError::Storage)?;
                f.seek(SeekFrom::Start(0)).map_err(TransferError::Storage)?;
                tracing::debug!(chunk = self.index, attempt, "restarting chunk");
            }
            let received = self.fetch_once(temp.as_file(), &counted)?;
            if received != self.range.len() {
                return Err(TransferError::PartialTransfer {
                    expected: self.range.len(),
                    received,
                });
            }
            Ok(())
        })?;
        Ok(temp)
    }

    fn fetch_once(&self, file: &File, counted: &Cell<u64>) -> Result<u64, TransferError> {
        let expected = self.range.len();
        let received = Cell::new(0u64);
        let storage_err: Cell<Option<std::io::Error>> = Cell::new(None);
        // Byte count the body would have reached had we accepted it.
        let overflow: Cell<Option<u64>> = Cell::new(None);

        let mut easy = curl::easy::Easy::new();
        configure_get(&mut easy, self.url, &self.options.headers)?;
        easy.range(&self.range.curl_range())?;

        let result = {
            let mut out = file;
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                if self.stop.is_cancelled() {
                    return Ok(0);
                }
                let would_be = received.get() + data.len() as u64;
                if would_be > expected {
                    // Server ignored the Range header and is sending the whole body.
                    overflow.set(Some(would_be));
                    return Ok(0);
                }
                if let Err(e) = out.write_all(data) {
                    storage_err.set(Some(e));
                    return Ok(0);
                }
                let n = data.len() as u64;
                received.set(received.get() + n);
                counted.set(counted.get() + n);
                self.reporter.report(self.counter.add(n));
                Ok(data.len())
            })?;
            // Called about once a second even while stalled.
            transfer.progress_function(|_, _, _, _| !self.stop.is_cancelled())?;
            transfer.perform()
        };

        if let Err(e) = result {
            if let Some(received) = overflow.get() {
                return Err(TransferError::PartialTransfer { expected, received });
            }
            let storage = storage_err.take();
            return Err(perform_error(e, &mut easy, self.stop.is_cancelled(), storage));
        }
        Ok(received.get())
    }
}
