//! Between-file bookkeeping and pacing pauses.

use crate::config::{PacingConfig, GIGABYTE};
use crate::error::EngineError;
use crate::interrupt::{InterruptPoller, Signal};
use crate::progress::{ProgressCallback, TransferEvent};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Pacing {
    config: PacingConfig,
    files_since_pause: u64,
    bytes_since_pause: u64,
    total_bytes: u64,
}

impl Pacing {
    pub fn new(config: PacingConfig) -> Self {
        Pacing {
            config,
            files_since_pause: 0,
            bytes_since_pause: 0,
            total_bytes: 0,
        }
    }

    /// Account for bytes read from a source during a copy.
    pub fn add_bytes(&mut self, bytes: u64) {
        self.bytes_since_pause += bytes;
        self.total_bytes += bytes;
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Called once per completed file. Honours a pending "pause after
    /// verify" first, then the file-count pause, then the volume pause.
    pub fn after_file(
        &mut self,
        faster: bool,
        poller: &mut InterruptPoller,
        progress: Option<&dyn ProgressCallback>,
    ) -> Result<(), EngineError> {
        self.files_since_pause += 1;

        if poller.take_pause_after_verify() {
            self.files_since_pause = 0;
            self.bytes_since_pause = 0;
            return match poller.poll(true, progress) {
                Signal::Continue => Ok(()),
                Signal::Abort => Err(EngineError::UserStop),
            };
        }

        if !faster && self.files_since_pause >= self.config.files_per_pause {
            let pause = self.config.files_pause;
            tracing::info!(files = self.files_since_pause, ?pause, "file count pause");
            emit(
                progress,
                TransferEvent::FilesPause {
                    files: self.files_since_pause,
                    pause,
                },
            );
            std::thread::sleep(pause);
            self.files_since_pause = 0;
        } else if self.bytes_since_pause > self.config.bytes_per_pause {
            let micros = self.bytes_since_pause * self.config.micros_per_kib / 1024;
            let pause = if faster {
                Duration::ZERO
            } else {
                Duration::from_micros(micros)
            };
            let gigabytes = self.total_bytes / GIGABYTE;
            tracing::info!(gigabytes, ?pause, "volume pause");
            emit(progress, TransferEvent::VolumePause { gigabytes, pause });
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
            self.bytes_since_pause = 0;
            self.files_since_pause = 0;
        }
        Ok(())
    }
}

fn emit(progress: Option<&dyn ProgressCallback>, event: TransferEvent) {
    if let Some(callback) = progress {
        callback.on_event(&event);
    }
}
