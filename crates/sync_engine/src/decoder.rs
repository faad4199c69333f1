//! Frame decoding
//!
//! Pure field extraction plus the stateful invalid-sample tally that drives
//! the periodic diagnostic line.

use contracts::{DecodedSample, RawFrame, RATE_BITS, VALID_BIT};
use tracing::info;

/// Minimum host time between diagnostic lines (µs)
pub const DIAGNOSTIC_INTERVAL_US: i64 = 1_000_000;

/// Two's-complement sign extension of the low `width` bits of `raw`.
///
/// Bits above `width` are ignored. `width` must be in `1..=32`.
pub fn sign_extend(raw: u32, width: u32) -> i32 {
    debug_assert!((1..=32).contains(&width), "invalid width {width}");
    let shift = 32 - width;
    ((raw << shift) as i32) >> shift
}

/// Decode validity and the signed rate from an aligned frame
pub fn decode_frame(frame: &RawFrame) -> DecodedSample {
    let bytes = frame.as_bytes();
    let raw = (u32::from(bytes[3] & 0x3F) << 16) | (u32::from(bytes[4]) << 8) | u32::from(bytes[5]);
    DecodedSample {
        valid: bytes[0] & VALID_BIT != 0,
        rate: sign_extend(raw, RATE_BITS),
    }
}

/// Stateful decoder with diagnostics
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    decoded: u64,
    invalid: u64,
    last_report: Option<i64>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame, counting invalid samples.
    ///
    /// Emits the diagnostic line when at least a second of host time has
    /// passed since the previous one (the first frame always reports).
    pub fn decode(
        &mut self,
        frame: &RawFrame,
        host_utime: i64,
        resync_count: u64,
    ) -> DecodedSample {
        let sample = decode_frame(frame);
        self.decoded += 1;
        if !sample.valid {
            self.invalid += 1;
        }
        observability::record_frame_decoded(sample.valid);

        let due = match self.last_report {
            None => true,
            Some(last) => host_utime - last > DIAGNOSTIC_INTERVAL_US,
        };
        if due {
            info!(
                invalid = self.invalid,
                resync = resync_count,
                decoded = self.decoded,
                "gyro diagnostics"
            );
            self.last_report = Some(host_utime);
        }

        sample
    }

    /// Frames decoded so far
    pub fn decoded_count(&self) -> u64 {
        self.decoded
    }

    /// Cumulative invalid samples
    pub fn invalid_count(&self) -> u64 {
        self.invalid
    }

    /// Host time of the last diagnostic line
    pub fn last_report(&self) -> Option<i64> {
        self.last_report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Phase;

    #[test]
    fn sign_extend_22_bit_extremes() {
        assert_eq!(sign_extend(0x200000, 22), -2_097_152);
        assert_eq!(sign_extend(0x1FFFFF, 22), 2_097_151);
        assert_eq!(sign_extend(0x3FFFFF, 22), -1);
        assert_eq!(sign_extend(0, 22), 0);
    }

    #[test]
    fn sign_extend_other_widths() {
        assert_eq!(sign_extend(0x80, 8), -128);
        assert_eq!(sign_extend(0x7F, 8), 127);
        assert_eq!(sign_extend(0x1, 1), -1);
        assert_eq!(sign_extend(0xFFFF_FFFF, 32), -1);
        // bits above the width are ignored
        assert_eq!(sign_extend(0xFF00_0005, 8), 5);
    }

    #[test]
    fn decode_raw_bytes() {
        let min = RawFrame::new([0x10, 0, 0, 0x20, 0x00, 0x00]);
        assert_eq!(
            decode_frame(&min),
            DecodedSample {
                valid: true,
                rate: -2_097_152
            }
        );

        let max = RawFrame::new([0xC0, 0xAA, 0x55, 0xDF, 0xFF, 0xFF]);
        assert_eq!(
            decode_frame(&max),
            DecodedSample {
                valid: false,
                rate: 2_097_151
            }
        );
    }

    #[test]
    fn encoded_tuples_decode_back() {
        let tuples = [
            (true, 0),
            (false, 1),
            (true, -1),
            (true, 2_097_151),
            (false, -2_097_152),
            (true, 123_456),
            (true, -654_321),
        ];
        for (k, &(valid, rate)) in tuples.iter().enumerate() {
            let frame = RawFrame::encode(valid, rate, Phase::new(k as u8));
            assert_eq!(decode_frame(&frame), DecodedSample { valid, rate });
        }
    }

    #[test]
    fn counts_invalid_and_rate_limits_reports() {
        let mut decoder = FrameDecoder::new();
        let good = RawFrame::encode(true, 5, Phase::new(0));
        let bad = RawFrame::encode(false, 5, Phase::new(1));

        decoder.decode(&good, 1_000, 0);
        assert_eq!(decoder.last_report(), Some(1_000));

        decoder.decode(&bad, 500_000, 0);
        decoder.decode(&bad, 1_001_000, 0);
        assert_eq!(decoder.last_report(), Some(1_000));

        decoder.decode(&good, 1_001_001, 0);
        assert_eq!(decoder.last_report(), Some(1_001_001));

        assert_eq!(decoder.decoded_count(), 4);
        assert_eq!(decoder.invalid_count(), 2);
    }
}
