//! Temporary files and final output naming.
//!
//! Every in-flight byte lives in a temp file named `.jdi-<random>.<role>.part`
//! inside the destination folder. Temp files are held as `tempfile::TempPath`
//! guards, so any exit path that drops the guard (success after persisting,
//! failure, cancellation, panic unwinding) removes the file. Only an
//! ungraceful process kill can leave one behind.

mod finalize;
mod unique;

use std::io;
use std::path::Path;

use tempfile::{NamedTempFile, TempPath};

pub use finalize::persist_unique;
pub use unique::unique_path;

pub const TEMP_PREFIX: &str = ".jdi-";
pub const TEMP_SUFFIX: &str = ".part";

/// Creates an empty, exclusively-owned temp file in `dir` for `role`
/// (e.g. `chunk3`, `audio`, `mux`).
pub fn create_temp(dir: &Path, role: &str) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&format!(".{role}{TEMP_SUFFIX}"))
        .rand_bytes(10)
        .tempfile_in(dir)
}

/// Reserves a temp path for an external program to write into. The file
/// exists (empty) so the name cannot be taken; the guard deletes it on drop.
pub fn reserve_temp_path(dir: &Path, role: &str) -> io::Result<TempPath> {
    Ok(create_temp(dir, role)?.into_temp_path())
}

/// True for names produced by `create_temp`.
pub fn is_temp_file_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}
