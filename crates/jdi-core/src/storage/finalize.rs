//! Move a finished temp file to its final, uniquified name.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use super::unique::unique_path;

/// Renames `temp` to `unique_path(desired)` without ever replacing an
/// existing file: if someone creates the candidate between the check and the
/// rename, the next free name is tried.
pub fn persist_unique(mut temp: TempPath, desired: &Path) -> io::Result<PathBuf> {
    loop {
        let candidate = unique_path(desired);
        match temp.persist_noclobber(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %candidate.display(), "name taken during finalize; retrying");
                temp = e.path;
            }
            Err(e) => return Err(e.error),
        }
    }
}
