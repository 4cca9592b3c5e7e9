//! # tcopy Engine - Verified, Throttled File Transfer Library
//!
//! A headless engine that copies a file or a directory tree so that the
//! result can never be silently truncated or corrupted, without saturating
//! the destination device, and while staying responsive to pause and abort
//! requests. Front ends (the `tcopy` CLI, tests, automation) drive it through
//! a command source and a progress callback.
//!
//! ## Overview
//!
//! - Depth-first tree walk with a circular-copy guard
//! - Per-file compare, copy, verify, retime state machine
//! - Duration-adjusted write throttling and between-file pacing pauses
//! - Copy, Move (delete verified source) and Mirror (delete orphans) modes
//! - Dry runs that report every decision without touching the filesystem
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{create_job, run_job, EngineConfig, Mode, NoCommands, RunOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let job = create_job(Mode::Copy, "/data/source", None, "/backup/source", None)?;
//!
//! let stats = run_job(
//!     &job,
//!     RunOptions::default(),
//!     EngineConfig::default(),
//!     Box::new(NoCommands),
//!     None,
//! )?;
//! println!("{} files copied, {} bytes", stats.files_copied, stats.bytes_copied);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (CopyJob, PathPair, FileSnapshot, stats)
//! - **error**: Error types and exit codes
//! - **config**: Buffer, pacing and polling tunables
//! - **checksums**: Rotate-xor content checksum
//! - **interrupt**: Pause / resume / abort polling
//! - **throttle**: Write-duration throttle
//! - **fs_ops**: Probing, directory validation, retime and delete
//! - **transfer**: Per-file state machine
//! - **walker**: Tree traversal and mirror cleanup
//! - **pacing**: Pauses between files
//! - **progress**: Status events and the callback trait
//! - **job**: Job orchestration (create, run)

pub mod model;
pub mod error;
pub mod config;
pub mod checksums;
pub mod interrupt;
pub mod throttle;
pub mod fs_ops;
pub mod transfer;
pub mod walker;
pub mod pacing;
pub mod progress;
pub mod job;

// Re-export main types and functions
pub use model::{CopyJob, FileIdentity, FileSnapshot, Mode, PathPair, RunOptions, RunStats};
pub use error::{EngineError, ErrorKind};
pub use config::{EngineConfig, PacingConfig};
pub use interrupt::{Command, CommandSource, NoCommands, ScriptedCommands};
pub use job::{create_job, run_job};
pub use progress::{Difference, ProgressCallback, RecordingProgress, TransferEvent};
