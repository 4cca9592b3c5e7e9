//! Tunables for the engine.

use crate::error::EngineError;
use std::time::Duration;

pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;
pub const GIGABYTE: u64 = 1024 * 1024 * 1024;

/// Pauses inserted between files to let the destination device catch up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Files completed before a fixed pause
    pub files_per_pause: u64,
    /// Length of that fixed pause
    pub files_pause: Duration,
    /// Bytes copied before a volume-proportional pause
    pub bytes_per_pause: u64,
    /// Microseconds of pause per 1024 bytes copied since the last pause
    pub micros_per_kib: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            files_per_pause: 50,
            files_pause: Duration::from_secs(10),
            bytes_per_pause: GIGABYTE,
            micros_per_kib: 30,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Size of the transfer and checksum buffer (bytes)
    pub buffer_size: usize,
    /// Longest accepted directory entry name (bytes)
    pub max_name_len: usize,
    /// Sleep between re-polls while paused
    pub pause_poll_interval: Duration,
    pub pacing: PacingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_name_len: 255,
            pause_poll_interval: Duration::from_millis(50),
            pacing: PacingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.buffer_size == 0 {
            return Err(EngineError::Usage(
                "buffer size must be greater than zero".to_string(),
            ));
        }
        if self.pacing.files_per_pause == 0 {
            return Err(EngineError::Usage(
                "files per pause must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
