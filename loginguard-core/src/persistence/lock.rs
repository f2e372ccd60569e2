use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use loginguard_common::helpers::fs::{secure_directory, secure_file};
use loginguard_common::LoginGuardError;
use tracing::debug;

use super::sibling_path;

/// Exclusive advisory lock on a state file, taken on a `.lock` file next to it.
///
/// Trackers keep their table in memory and overwrite the file with it, so
/// two processes sharing a file would silently undo each other's changes.
/// The lock is released when dropped.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    pub fn acquire(state_path: &Path) -> Result<Self, LoginGuardError> {
        if let Some(parent) = state_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
                secure_directory(parent)?;
            }
        }

        let path = sibling_path(state_path, ".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        secure_file(&path)?;

        if let Err(error) = FileExt::try_lock_exclusive(&file) {
            if error.kind() == fs2::lock_contended_error().kind() {
                return Err(LoginGuardError::StoreLocked(state_path.to_path_buf()));
            }
            return Err(error.into());
        }
        debug!(?path, "Locked state store");

        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
