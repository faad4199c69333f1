//! Sample aggregation
//!
//! Accumulates N valid samples, averages them and publishes one
//! [`GyroRecord`] through a borrowed [`RecordSink`].

use std::f64::consts::PI;

use contracts::{AggregatorConfig, GyroRecord, Phase, RecordSink, TimeCorrelator};
use tracing::{instrument, trace, warn};

/// Rate scale factor (degrees per second per LSB)
pub const DEG_PER_S_PER_LSB: f64 = 476.8e-6;

/// Convert an average rate in LSB units to radians per second
pub fn rate_to_rads(average_lsb: f64) -> f64 {
    average_lsb * DEG_PER_S_PER_LSB * PI / 180.0
}

/// N-sample averaging window
pub struct SampleAggregator<'s> {
    nsamples: usize,
    samples: Vec<i32>,
    sum: i64,
    count: usize,
    published: u64,
    failures: u64,
    sink: &'s mut dyn RecordSink,
}

impl<'s> SampleAggregator<'s> {
    pub fn new(config: &AggregatorConfig, sink: &'s mut dyn RecordSink) -> Self {
        let nsamples = config.nsamples.max(1);
        Self {
            nsamples,
            samples: vec![0; nsamples],
            sum: 0,
            count: 0,
            published: 0,
            failures: 0,
            sink,
        }
    }

    /// Window size
    pub fn nsamples(&self) -> usize {
        self.nsamples
    }

    /// Samples currently buffered
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Buffered samples in arrival order
    pub fn pending(&self) -> &[i32] {
        &self.samples[..self.count]
    }

    /// Records handed to the sink successfully
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Records the sink rejected
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Add one valid sample; returns true when a record was emitted.
    ///
    /// `phase` is the phase of the frame carrying the sample and is used to
    /// timestamp the record if this sample completes the window.
    pub fn push(&mut self, rate: i32, phase: Phase, correlator: &dyn TimeCorrelator) -> bool {
        self.samples[self.count] = rate;
        self.sum += i64::from(rate);
        self.count += 1;

        if self.count < self.nsamples {
            return false;
        }

        let utime = correlator.estimate_device_time(phase);
        self.publish(utime);
        true
    }

    /// Drop buffered samples; capacity is kept.
    pub fn reset(&mut self) {
        self.sum = 0;
        self.count = 0;
    }

    #[instrument(name = "aggregator_publish", skip(self), fields(sink = self.sink.name()))]
    fn publish(&mut self, utime: i64) {
        let average = self.sum as f64 / self.count as f64;
        let record = GyroRecord {
            utime,
            rads: rate_to_rads(average),
            nsamples: self.count as i32,
            samples: self.samples[..self.count].to_vec(),
        };
        self.reset();

        match self.sink.publish(&record) {
            Ok(()) => {
                self.published += 1;
                trace!(utime, rads = record.rads, "record published");
                observability::record_record_published(&record);
            }
            Err(e) => {
                self.failures += 1;
                warn!(error = %e, failures = self.failures, "publish failed");
                observability::record_publish_failure(self.sink.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CollectSink, FixedTime};

    #[test]
    fn averages_six_samples() {
        let mut sink = CollectSink::default();
        let clock = FixedTime(1_000_000);
        let config = AggregatorConfig { nsamples: 6 };
        let mut aggregator = SampleAggregator::new(&config, &mut sink);

        let mut emitted = Vec::new();
        for (k, rate) in [10, 20, 30, 40, 50, 60].into_iter().enumerate() {
            emitted.push(aggregator.push(rate, Phase::new(k as u8), &clock));
        }
        assert_eq!(emitted, vec![false, false, false, false, false, true]);
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.published(), 1);
        drop(aggregator);

        assert_eq!(sink.records.len(), 1);
        let record = &sink.records[0];
        assert_eq!(record.nsamples, 6);
        assert_eq!(record.samples, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(record.average_lsb(), 35.0);
        assert!((record.rads - 2.913e-4).abs() < 1e-6, "rads = {}", record.rads);
        // timestamped with the phase of the sixth sample (5 % 4 = 1)
        assert_eq!(record.utime, 1_000_001);
    }

    #[test]
    fn sum_does_not_overflow_i32() {
        let mut sink = CollectSink::default();
        let config = AggregatorConfig { nsamples: 4 };
        let mut aggregator = SampleAggregator::new(&config, &mut sink);
        for _ in 0..4 {
            aggregator.push(2_097_151, Phase::new(0), &FixedTime(0));
        }
        drop(aggregator);
        assert_eq!(sink.records[0].average_lsb(), 2_097_151.0);
        assert!((sink.records[0].rads - rate_to_rads(2_097_151.0)).abs() < 1e-12);
    }

    #[test]
    fn buffer_is_reused_across_windows() {
        let mut sink = CollectSink::default();
        let config = AggregatorConfig { nsamples: 2 };
        let mut aggregator = SampleAggregator::new(&config, &mut sink);
        for rate in [1, 3, -5, -7, 9] {
            aggregator.push(rate, Phase::new(0), &FixedTime(0));
        }
        assert_eq!(aggregator.pending(), &[9]);
        aggregator.reset();
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.nsamples(), 2);
        drop(aggregator);

        let samples: Vec<Vec<i32>> = sink.records.iter().map(|r| r.samples.clone()).collect();
        assert_eq!(samples, vec![vec![1, 3], vec![-5, -7]]);
        assert_eq!(sink.records[1].average_lsb(), -6.0);
    }

    #[test]
    fn sink_failure_is_counted_not_raised() {
        let mut sink = CollectSink {
            fail: true,
            ..Default::default()
        };
        let config = AggregatorConfig { nsamples: 1 };
        let mut aggregator = SampleAggregator::new(&config, &mut sink);
        assert!(aggregator.push(7, Phase::new(3), &FixedTime(0)));
        assert!(aggregator.push(8, Phase::new(0), &FixedTime(0)));
        assert_eq!(aggregator.failures(), 2);
        assert_eq!(aggregator.published(), 0);
        assert!(aggregator.is_empty());
    }
}
