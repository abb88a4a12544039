//! File helpers shared by the marker engine
//!
//! - Atomic replace (temp file + rename) so a reader never observes a
//!   half-written document
//! - Quiet deletion of files and directories (missing targets are not errors)

use crate::Result;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Path of the temporary sibling used by [`write_atomic`] (`<name>.tmp`)
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` atomically
///
/// The bytes go to `<path>.tmp` in the same directory which is then renamed
/// over `path`. Parent directories are created as needed. On failure the
/// temporary file is removed and any previous file at `path` is untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path_for(path);
    if let Err(e) = fs::write(&tmp_path, contents).and_then(|_| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Delete a file, ignoring a missing target
///
/// Returns `true` if a file was removed.
pub fn remove_file_quietly(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            true
        }
        Err(e) => {
            warn!("Failed to delete {}: {}", path.display(), e);
            false
        }
    }
}

/// Delete a directory and everything below it, ignoring a missing target
///
/// Returns `true` if a directory was removed.
pub fn remove_dir_quietly(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Deleted directory {}", path.display());
            true
        }
        Err(e) => {
            warn!("Failed to delete directory {}: {}", path.display(), e);
            false
        }
    }
}
