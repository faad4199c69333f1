//! Shared fixtures for unit tests.

use std::cell::Cell;

use contracts::{
    ByteSource, ContractError, GyroRecord, HostClock, Phase, RawFrame, RecordSink, TimeCorrelator,
};

/// Validity and rate of synthetic frame `k`.
///
/// Rates stay in [-63, 63] so the top two bits of every non-start byte are
/// 0 or 3 and can never count up twice in a row.
pub(crate) fn frame_sample(k: usize) -> (bool, i32) {
    (k % 5 != 3, (k as i32 % 127) - 63)
}

/// Encoded frames `0..frames` with phases counting up from `start_phase`
pub(crate) fn frame_stream(frames: usize, start_phase: u8) -> Vec<u8> {
    (0..frames)
        .flat_map(|k| {
            let (valid, rate) = frame_sample(k);
            let phase = Phase::new(start_phase.wrapping_add(k as u8));
            *RawFrame::encode(valid, rate, phase).as_bytes()
        })
        .collect()
}

#[derive(Default)]
pub(crate) struct CollectSink {
    pub records: Vec<GyroRecord>,
    pub fail: bool,
}

impl RecordSink for CollectSink {
    fn name(&self) -> &str {
        "collect"
    }

    fn publish(&mut self, record: &GyroRecord) -> Result<(), ContractError> {
        if self.fail {
            return Err(ContractError::sink_write("collect", "rejected"));
        }
        self.records.push(record.clone());
        Ok(())
    }
}

/// Correlator returning a fixed base plus the phase value
pub(crate) struct FixedTime(pub i64);

impl TimeCorrelator for FixedTime {
    fn update(&mut self, _host_utime: i64, _phase: Phase) {}

    fn estimate_device_time(&self, phase: Phase) -> i64 {
        self.0 + i64::from(phase.value())
    }

    fn resync_count(&self) -> u64 {
        0
    }
}

pub(crate) struct VecSource {
    bytes: Vec<u8>,
    pos: usize,
}

impl VecSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

impl ByteSource for VecSource {
    fn name(&self) -> &str {
        "vec"
    }

    fn next_byte(&mut self) -> Result<u8, ContractError> {
        let byte = self
            .bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| ContractError::stream_closed("vec"))?;
        self.pos += 1;
        Ok(byte)
    }
}

/// Clock advancing by a fixed step on every read
pub(crate) struct StepClock {
    next: Cell<i64>,
    step: i64,
}

impl StepClock {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }
}

impl HostClock for StepClock {
    fn now_utime(&self) -> i64 {
        let now = self.next.get();
        self.next.set(now + self.step);
        now
    }
}
