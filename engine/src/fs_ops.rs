//! Filesystem operations module.
//!
//! This module provides the low-level operations the walker and the transfer
//! state machine are built on:
//! - Probing a path's attributes without side effects
//! - Validating (creating) destination directories with mirrored permissions
//! - Retiming and deleting files

use crate::error::EngineError;
use crate::model::{FileIdentity, FileSnapshot};
use crate::progress::{ProgressCallback, TransferEvent};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Permission bits used when no existing ancestor can be probed.
const FALLBACK_DIR_MODE: u32 = 0o755;

/// Probe `path` as a regular file (symlinks followed).
///
/// Anything that is missing or not a regular file yields an absent snapshot.
pub fn probe_file(path: &Path) -> FileSnapshot {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => snapshot(&metadata),
        _ => FileSnapshot::absent(),
    }
}

/// Probe `path` as a directory (symlinks followed).
pub fn probe_dir(path: &Path) -> FileSnapshot {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => snapshot(&metadata),
        _ => FileSnapshot::absent(),
    }
}

#[cfg(unix)]
fn snapshot(metadata: &fs::Metadata) -> FileSnapshot {
    use std::os::unix::fs::MetadataExt;

    FileSnapshot {
        exists: true,
        size: metadata.len(),
        mtime_sec: metadata.mtime(),
        mtime_nsec: u32::try_from(metadata.mtime_nsec()).unwrap_or(0),
        identity: FileIdentity {
            device: metadata.dev(),
            inode: metadata.ino(),
        },
        mode: metadata.mode(),
    }
}

#[cfg(not(unix))]
fn snapshot(metadata: &fs::Metadata) -> FileSnapshot {
    let mtime = filetime::FileTime::from_last_modification_time(metadata);
    FileSnapshot {
        exists: true,
        size: metadata.len(),
        mtime_sec: mtime.unix_seconds(),
        mtime_nsec: mtime.nanoseconds(),
        identity: FileIdentity::default(),
        mode: if metadata.permissions().readonly() {
            0o555
        } else {
            FALLBACK_DIR_MODE
        },
    }
}

/// Ensures destination directories exist, creating missing ancestors first.
///
/// Each new directory takes the permission bits of its nearest existing
/// ancestor (or of `/` or `.` when none can be found). Paths already
/// validated in this run are not probed again.
#[derive(Debug, Default)]
pub struct DirectoryValidator {
    validated: HashSet<PathBuf>,
    dry_run: bool,
    created: u64,
}

impl DirectoryValidator {
    pub fn new(dry_run: bool) -> Self {
        DirectoryValidator {
            dry_run,
            ..Self::default()
        }
    }

    /// Directories created (or, in a dry run, reported) so far.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn validate(
        &mut self,
        path: &Path,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<(), EngineError> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        self.ensure(path, progress).map(|_| ())
    }

    /// Make sure `path` exists and return its permission bits.
    fn ensure(
        &mut self,
        path: &Path,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<u32, EngineError> {
        let existing = probe_dir(path);
        if existing.exists {
            self.validated.insert(path.to_path_buf());
            return Ok(existing.mode);
        }
        if self.validated.contains(path) {
            // Only reachable in a dry run, where nothing was really created.
            return self.template_mode(path, progress);
        }

        let mode = self.template_mode(path, progress)?;
        if let Some(callback) = progress {
            callback.on_event(&TransferEvent::MakeDir {
                path: path.to_path_buf(),
                mode,
            });
        }
        tracing::debug!(path = %path.display(), mode = format_args!("{:o}", mode), "mkdir");
        if !self.dry_run {
            create_dir(path, mode).map_err(|e| EngineError::io("Could Not Create", path, e))?;
        }
        self.created += 1;
        self.validated.insert(path.to_path_buf());
        Ok(mode)
    }

    fn template_mode(
        &mut self,
        path: &Path,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<u32, EngineError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.ensure(parent, progress),
            Some(_) => Ok(mode_of(Path::new("."))),
            None => Ok(mode_of(path)),
        }
    }
}

fn mode_of(path: &Path) -> u32 {
    let probed = probe_dir(path);
    if probed.exists {
        probed.mode
    } else {
        FALLBACK_DIR_MODE
    }
}

#[cfg(unix)]
fn create_dir(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().mode(mode & 0o7777).create(path)
}

#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32) -> io::Result<()> {
    fs::DirBuilder::new().create(path)
}

/// Set `path`'s modification time to the one captured in `source`.
/// The access time is left untouched.
pub fn retime(path: &Path, source: &FileSnapshot) -> Result<(), EngineError> {
    let mtime = filetime::FileTime::from_unix_time(source.mtime_sec, source.mtime_nsec);
    filetime::set_file_mtime(path, mtime).map_err(|e| EngineError::io("Time Set Failed", path, e))
}

/// Delete a file; failure is fatal.
pub fn remove_file(path: &Path) -> Result<(), EngineError> {
    fs::remove_file(path).map_err(|e| EngineError::io("Could Not Delete", path, e))
}

/// Delete a file; failure is reported as a warning and otherwise ignored.
/// Returns whether the file is gone.
pub fn remove_file_best_effort(path: &Path, progress: Option<&dyn ProgressCallback>) -> bool {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to delete");
        if let Some(callback) = progress {
            callback.on_event(&TransferEvent::Warning {
                path: path.to_path_buf(),
                message: format!("Failed to delete ({})", e),
            });
        }
        return false;
    }
    true
}
