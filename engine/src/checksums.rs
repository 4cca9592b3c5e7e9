//! Content checksum used for equality checks.
//!
//! A 32-bit rotate-and-xor accumulator: for each byte, xor it into the low
//! bits, then rotate the word left by one. It is cheap and order-sensitive,
//! and it is only ever a secondary gate after size and modification time.
//! It is not an integrity hash; collisions are possible.

use crate::error::EngineError;
use crate::interrupt::InterruptPoller;
use crate::progress::ProgressCallback;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Seed every file's checksum starts from.
pub const CHECKSUM_SEED: u32 = 0;

/// Fold `buffer` into `state` and return the new state.
pub fn update(state: u32, buffer: &[u8]) -> u32 {
    buffer
        .iter()
        .fold(state, |acc, &byte| (acc ^ u32::from(byte)).rotate_left(1))
}

/// Running checksum of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum(u32);

impl Checksum {
    pub fn new() -> Self {
        Checksum(CHECKSUM_SEED)
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0 = update(self.0, data);
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

/// Checksum a whole file through `buffer`, polling for interrupts after every
/// read so a long file stays responsive to pause and abort.
pub fn file_checksum(
    path: &Path,
    buffer: &mut [u8],
    poller: &mut InterruptPoller,
    progress: Option<&dyn ProgressCallback>,
) -> Result<u32, EngineError> {
    let mut file = File::open(path).map_err(|e| EngineError::io("Could Not Open", path, e))?;
    let mut checksum = Checksum::new();
    loop {
        let read = match file.read(buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineError::io("Could Not Read", path, e)),
        };
        checksum.update(&buffer[..read]);
        poller.check(progress)?;
        if read == 0 {
            break;
        }
    }
    Ok(checksum.value())
}
