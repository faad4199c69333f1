//! 时间契约
//!
//! Host clock access and the device/host time correlation interface.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::Phase;

/// Maps the device phase counter onto host time
pub trait TimeCorrelator {
    /// Feed one observation: the host receipt time of a frame and its phase.
    fn update(&mut self, host_utime: i64, phase: Phase);

    /// Estimate the host timestamp (µs) of the most recent frame carrying `phase`.
    fn estimate_device_time(&self, phase: Phase) -> i64;

    /// Number of times the mapping was discarded and rebuilt
    fn resync_count(&self) -> u64;

    /// Frame alignment was lost; any number of frames may be missing before
    /// the next [`TimeCorrelator::update`].
    fn sync_lost(&mut self) {}
}

/// Source of host wall-clock time
pub trait HostClock {
    /// Microseconds since the Unix epoch
    fn now_utime(&self) -> i64;
}

/// Wall clock backed by [`SystemTime`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl HostClock for SystemClock {
    fn now_utime(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX),
            Err(before) => -i64::try_from(before.duration().as_micros()).unwrap_or(i64::MAX),
        }
    }
}
