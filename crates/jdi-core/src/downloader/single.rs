//! Single-stream GET for servers without usable range support.

use std::cell::Cell;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::TempPath;

use super::reporter::Reporter;
use super::{configure_get, perform_error, TransferOptions};
use crate::control::CancelSignal;
use crate::error::DownloadError;
use crate::retry::{run_with_retry, TransferError};
use crate::storage;

/// Streams the whole body into one temp file. When `expected_len` is known a
/// short body is a (retriable) partial transfer.
pub(super) fn download_single(
    url: &str,
    options: &TransferOptions,
    dir: &Path,
    expected_len: Option<u64>,
    reporter: &Reporter,
    cancel: &CancelSignal,
) -> Result<TempPath, DownloadError> {
    let mut temp = storage::create_temp(dir, "single")?;

    let received = run_with_retry(&options.retry, cancel, |attempt| {
        if attempt > 1 {
            let f = temp.as_file_mut();
            f.set_len(0).map_err(TransferError::Storage)?;
            f.seek(SeekFrom::Start(0)).map_err(TransferError::Storage)?;
        }
        let received = Cell::new(0u64);
        let storage_err: Cell<Option<std::io::Error>> = Cell::new(None);

        let mut easy = curl::easy::Easy::new();
        configure_get(&mut easy, url, &options.headers)?;
        let result = {
            let mut out = temp.as_file();
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                if cancel.is_cancelled() {
                    return Ok(0);
                }
                if let Err(e) = out.write_all(data) {
                    storage_err.set(Some(e));
                    return Ok(0);
                }
                received.set(received.get() + data.len() as u64);
                reporter.report(received.get());
                Ok(data.len())
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            transfer.perform()
        };
        if let Err(e) = result {
            return Err(perform_error(e, &mut easy, cancel.is_cancelled(), storage_err.take()));
        }

        let received = received.get();
        match expected_len {
            Some(expected) if received != expected => {
                Err(TransferError::PartialTransfer { expected, received })
            }
            _ => Ok(received),
        }
    })?;

    reporter.finish(received);
    temp.as_file().sync_all()?;
    Ok(temp.into_temp_path())
}
