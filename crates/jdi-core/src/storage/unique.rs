//! Collision-free output names: `name (n).ext`.

use std::path::{Path, PathBuf};

/// Returns `desired` if nothing exists there, otherwise the first free
/// `stem (n).ext` for n = 1, 2, ...
///
/// Check-then-use: another writer may still grab the name before we do.
/// `persist_unique` closes that gap for our own renames.
pub fn unique_path(desired: &Path) -> PathBuf {
    if !desired.exists() {
        return desired.to_path_buf();
    }
    let parent = desired.parent().unwrap_or_else(|| Path::new(""));
    let stem = desired
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = desired
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let candidate = parent.join(format!("{stem} ({n}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
