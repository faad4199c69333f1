//! 帧格式契约
//!
//! The gyro emits 6-byte frames with no delimiter. The top two bits of the
//! first byte carry a phase counter that advances by one (mod 4) per frame.
//!
//! ```text
//! byte 0: [phase:2][-:1][valid:1][-:4]
//! byte 1: reserved
//! byte 2: reserved
//! byte 3: [-:2][rate 21..16]
//! byte 4: [rate 15..8]
//! byte 5: [rate 7..0]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame length in bytes
pub const FRAME_LEN: usize = 6;

/// Width of the signed rate field in bits
pub const RATE_BITS: u32 = 22;

/// Mask selecting the raw rate field
pub const RATE_MASK: u32 = (1 << RATE_BITS) - 1;

/// Validity flag in byte 0
pub const VALID_BIT: u8 = 1 << 4;

/// 2-bit rotating phase code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phase(u8);

impl Phase {
    /// Number of distinct phase values
    pub const CYCLE: u8 = 4;

    /// Build a phase from a raw value (reduced mod 4)
    pub fn new(value: u8) -> Self {
        Self(value % Self::CYCLE)
    }

    /// Extract the phase carried in the top two bits of a byte
    pub fn of_byte(byte: u8) -> Self {
        Self(byte >> 6)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Phase expected on the next frame
    pub fn next(self) -> Self {
        Self((self.0 + 1) % Self::CYCLE)
    }

    /// Forward distance from `earlier` to `self` on a counter of `wrap`
    /// values (`1..=4`), in `[0, wrap)`
    pub fn distance_from(self, earlier: Phase, wrap: u8) -> u8 {
        let wrap = wrap.clamp(1, Self::CYCLE);
        (self.0 % wrap + wrap - earlier.0 % wrap) % wrap
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frame synchronizer state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Reset lock statistics
    #[default]
    Startup,
    /// Seed one phase per byte position
    Acquire1,
    /// Count phase increments per byte position
    Acquire2,
    /// Frame alignment known
    Locked,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Startup => "startup",
            SyncState::Acquire1 => "acquire1",
            SyncState::Acquire2 => "acquire2",
            SyncState::Locked => "locked",
        };
        f.write_str(name)
    }
}

/// A complete, aligned 6-byte frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Encode a sample into the device frame layout.
    ///
    /// `rate` is truncated to its low 22 bits; reserved bytes are zero.
    pub fn encode(valid: bool, rate: i32, phase: Phase) -> Self {
        let raw = (rate as u32) & RATE_MASK;
        let mut head = phase.value() << 6;
        if valid {
            head |= VALID_BIT;
        }
        Self([
            head,
            0,
            0,
            ((raw >> 16) & 0x3F) as u8,
            (raw >> 8) as u8,
            raw as u8,
        ])
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Phase carried by the first byte
    pub fn phase(&self) -> Phase {
        Phase::of_byte(self.0[0])
    }
}

impl From<[u8; FRAME_LEN]> for RawFrame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

/// Decoded gyro sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedSample {
    /// Device validity flag
    pub valid: bool,
    /// Sign-extended 22-bit rate (LSB units)
    pub rate: i32,
}
