//! Duration-adjusted write throttling.
//!
//! After every buffer write the observed duration is normalised to a full
//! buffer and remembered, along with the fastest normalised write seen so far
//! in this run. Before the next write the engine sleeps for the gap between
//! the two, so a slow write earns the device an equivalent breather instead of
//! being followed by a burst.

use std::time::Duration;

/// Write timing history, shared by every file of a run.
///
/// A zero `fastest_write_ns` means nothing has been measured yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Throttle {
    fastest_write_ns: u64,
    previous_write_ns: u64,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fastest_write_ns(&self) -> u64 {
        self.fastest_write_ns
    }

    pub fn previous_write_ns(&self) -> u64 {
        self.previous_write_ns
    }

    /// Sleep to insert before writing `bytes` out of a `capacity`-sized buffer.
    ///
    /// Partial buffers get a proportionally shorter delay.
    pub fn next_delay(&self, bytes: usize, capacity: usize) -> Duration {
        let gap = self.previous_write_ns.saturating_sub(self.fastest_write_ns);
        let nanos = if bytes != capacity && capacity > 0 {
            scale(gap, bytes as u64, capacity as u64)
        } else {
            gap
        };
        Duration::from_nanos(nanos)
    }

    /// Record how long writing `bytes` took.
    pub fn record_write(&mut self, elapsed: Duration, bytes: usize, capacity: usize) {
        let measured = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        let normalised = if bytes != capacity && bytes > 0 {
            scale(measured, capacity as u64, bytes as u64)
        } else {
            measured
        };
        self.previous_write_ns = normalised;
        if self.fastest_write_ns == 0 || normalised < self.fastest_write_ns {
            self.fastest_write_ns = normalised;
        }
    }
}

fn scale(value: u64, numerator: u64, denominator: u64) -> u64 {
    let scaled = u128::from(value) * u128::from(numerator) / u128::from(denominator);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}
