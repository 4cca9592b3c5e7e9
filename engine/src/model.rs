//! Core data model for copy runs.
//!
//! - CopyJob: what to copy, where, and how (immutable for the whole run)
//! - PathPair: one source/destination pair visited by the walker
//! - FileSnapshot: attributes of one path captured by a probe
//! - RunOptions, RunStats: caller switches and the counters handed back

use std::path::{Path, PathBuf};

/// The operation mode for a copy job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Copy files; source remains unchanged
    Copy,
    /// Copy, then delete each source file once its copy is verified
    Move,
    /// Copy, then delete destination files that have no source counterpart
    Mirror,
    /// Two-way reconciliation; accepted by the parser, refused by the engine
    Sync,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Copy => write!(f, "Copy"),
            Mode::Move => write!(f, "Move"),
            Mode::Mirror => write!(f, "Mirror"),
            Mode::Sync => write!(f, "Sync"),
        }
    }
}

/// A validated copy job.
///
/// Paths are already split into a directory part and an optional file name.
/// An empty file name means "the whole directory".
#[derive(Debug, Clone)]
pub struct CopyJob {
    pub(crate) mode: Mode,
    pub(crate) source_dir: PathBuf,
    pub(crate) source_file: Option<PathBuf>,
    pub(crate) dest_dir: PathBuf,
    pub(crate) dest_file: Option<PathBuf>,
}

impl CopyJob {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn dest_file(&self) -> Option<&Path> {
        self.dest_file.as_deref()
    }

    /// True when the job names one explicit file instead of a directory.
    pub fn is_single_file(&self) -> bool {
        self.source_file.is_some()
    }
}

/// One source/destination pair, owned by the traversal frame that built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPair {
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl PathPair {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        PathPair {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// The pair for a named child of both directories.
    pub fn child(&self, name: &std::ffi::OsStr) -> Self {
        PathPair {
            source: self.source.join(name),
            dest: self.dest.join(name),
        }
    }
}

/// Filesystem identity of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileIdentity {
    pub device: u64,
    pub inode: u64,
}

/// Attributes of a path at the moment it was probed.
///
/// A path that does not exist (or is not of the probed type) yields the
/// zeroed snapshot with `exists == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileSnapshot {
    pub exists: bool,
    pub size: u64,
    pub mtime_sec: i64,
    pub mtime_nsec: u32,
    pub identity: FileIdentity,
    pub mode: u32,
}

impl FileSnapshot {
    pub fn absent() -> Self {
        FileSnapshot::default()
    }
}

/// Caller-selected switches for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Disable every pacing sleep and throttle delay
    pub faster: bool,
    /// Exercise comparison and reporting without mutating the filesystem
    pub dry_run: bool,
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Regular files that went through the transfer state machine
    pub files_processed: u64,
    /// Files whose content was (or, in a dry run, would have been) copied
    pub files_copied: u64,
    /// Files found identical at the destination
    pub files_identical: u64,
    pub bytes_copied: u64,
    pub stale_deleted: u64,
    pub sources_deleted: u64,
    pub mirror_deleted: u64,
    pub dirs_created: u64,
}
