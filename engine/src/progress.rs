//! Progress reporting.
//!
//! The engine emits one [`TransferEvent`] per significant action. Front ends
//! implement [`ProgressCallback`] to turn them into status lines; the engine
//! itself never prints.

use crate::model::RunStats;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Which dimensions made a destination file differ from its source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Difference {
    /// Destination size minus source size, when the sizes differ
    pub size_delta: Option<i64>,
    pub seconds: bool,
    pub nanoseconds: bool,
    pub checksum: bool,
}

impl Difference {
    pub fn is_empty(&self) -> bool {
        self.size_delta.is_none() && !self.seconds && !self.nanoseconds && !self.checksum
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diff")?;
        if let Some(delta) = self.size_delta {
            write!(f, " {} bytes", delta)?;
        }
        if self.seconds {
            write!(f, " sec")?;
        }
        if self.nanoseconds {
            write!(f, " nsec")?;
        }
        if self.checksum {
            write!(f, " chk")?;
        }
        Ok(())
    }
}

/// A significant action taken (or, in a dry run, decided) by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    MakeDir { path: PathBuf, mode: u32 },
    /// Checksums of an equal-size pair are about to be compared
    Verify { source: PathBuf, dest: PathBuf },
    /// The freshly written destination is about to be re-read
    VerifyDest { dest: PathBuf },
    /// An existing destination differs and will be replaced
    DeleteStale { dest: PathBuf, diff: Difference },
    Copy { source: PathBuf, dest: PathBuf },
    /// Move mode removes the verified source
    DeleteSource { source: PathBuf },
    /// Mirror mode removes a destination file with no source counterpart
    MirrorDelete { dest: PathBuf },
    Paused,
    Resumed,
    PauseRequested,
    FilesPause { files: u64, pause: Duration },
    VolumePause { gigabytes: u64, pause: Duration },
    Warning { path: PathBuf, message: String },
}

/// Trait for receiving progress updates from a run.
///
/// All methods are called synchronously from the engine's single thread.
pub trait ProgressCallback: Send {
    /// Called once before traversal starts.
    fn on_run_started(&self, _dry_run: bool) {}

    /// Called for every status event.
    fn on_event(&self, event: &TransferEvent);

    /// Called once after a successful run.
    fn on_run_completed(&self, _stats: &RunStats) {}
}

/// Collects every event; used by tests and by callers that post-process a run.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<TransferEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TransferEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_event(&self, event: &TransferEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
