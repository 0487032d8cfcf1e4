//! Concatenation of finished chunks into the output file.

use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::{NamedTempFile, TempPath};

use crate::control::CancelSignal;
use crate::error::DownloadError;
use crate::storage;

/// Appends `chunks` (in range order) into a fresh temp file and returns its
/// guard. Chunk files are deleted as soon as they have been copied.
pub(super) fn concatenate(
    dir: &Path,
    chunks: Vec<NamedTempFile>,
    expected_len: u64,
    cancel: &CancelSignal,
) -> Result<TempPath, DownloadError> {
    let mut out = storage::create_temp(dir, "assemble")?;
    let mut written = 0u64;
    for mut chunk in chunks {
        cancel.check()?;
        let f = chunk.as_file_mut();
        f.seek(SeekFrom::Start(0))?;
        written += io::copy(f, out.as_file_mut())?;
    }
    if written != expected_len {
        return Err(DownloadError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("assembled {written} bytes, expected {expected_len}"),
        )));
    }
    out.as_file_mut().flush()?;
    out.as_file().sync_all()?;
    Ok(out.into_temp_path())
}
