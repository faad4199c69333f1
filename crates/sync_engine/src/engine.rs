//! Gyro engine: the single-threaded pull loop.
//!
//! Bytes flow ByteSource → FrameSynchronizer → FrameDecoder →
//! SampleAggregator → RecordSink. The engine owns all per-stream state; the
//! sink and the time correlator are borrowed for its lifetime.

use contracts::{
    ByteSource, ContractError, EngineConfig, HostClock, RawFrame, RecordSink, SyncState,
    SystemClock, TimeCorrelator,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::aggregator::SampleAggregator;
use crate::decoder::FrameDecoder;
use crate::synchronizer::{FrameSynchronizer, SyncEvent};

/// Running totals for one engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Bytes consumed
    pub bytes: u64,
    /// Complete locked frames
    pub frames: u64,
    pub valid_samples: u64,
    pub invalid_samples: u64,
    /// Lock acquisitions
    pub locks: u64,
    /// Phase mismatches while locked
    pub lost_sync: u64,
    pub records_published: u64,
    pub publish_failures: u64,
}

impl EngineStats {
    /// Records emitted, whether or not the sink accepted them
    pub fn records_emitted(&self) -> u64 {
        self.records_published + self.publish_failures
    }
}

/// Frame engine for one gyro stream
pub struct GyroEngine<'s> {
    synchronizer: FrameSynchronizer,
    decoder: FrameDecoder,
    aggregator: SampleAggregator<'s>,
    correlator: &'s mut dyn TimeCorrelator,
    clock: Box<dyn HostClock + 's>,
    stats: EngineStats,
}

impl<'s> GyroEngine<'s> {
    pub fn new(
        config: &EngineConfig,
        correlator: &'s mut dyn TimeCorrelator,
        sink: &'s mut dyn RecordSink,
    ) -> Self {
        Self {
            synchronizer: FrameSynchronizer::new(&config.frame_sync),
            decoder: FrameDecoder::new(),
            aggregator: SampleAggregator::new(&config.aggregator, sink),
            correlator,
            clock: Box::new(SystemClock),
            stats: EngineStats::default(),
        }
    }

    /// Replace the host clock used by [`GyroEngine::run`]
    pub fn with_clock(mut self, clock: impl HostClock + 's) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn sync_state(&self) -> SyncState {
        self.synchronizer.state()
    }

    pub fn synchronizer(&self) -> &FrameSynchronizer {
        &self.synchronizer
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn aggregator(&self) -> &SampleAggregator<'s> {
        &self.aggregator
    }

    /// Process one byte received at `host_utime`
    pub fn feed(&mut self, byte: u8, host_utime: i64) -> SyncEvent {
        self.stats.bytes += 1;
        let event = self.synchronizer.push(byte);
        match event {
            SyncEvent::Pending => {}
            SyncEvent::Locked => {
                self.stats.locks += 1;
                observability::record_lock_acquired();
            }
            SyncEvent::LostSync => {
                self.stats.lost_sync += 1;
                self.correlator.sync_lost();
                observability::record_sync_lost();
            }
            SyncEvent::Frame(frame) => self.on_frame(&frame, host_utime),
        }
        event
    }

    fn on_frame(&mut self, frame: &RawFrame, host_utime: i64) {
        self.stats.frames += 1;
        let phase = frame.phase();
        self.correlator.update(host_utime, phase);

        let sample = self
            .decoder
            .decode(frame, host_utime, self.correlator.resync_count());
        if !sample.valid {
            self.stats.invalid_samples += 1;
            return;
        }
        self.stats.valid_samples += 1;

        if self.aggregator.push(sample.rate, phase, &*self.correlator) {
            self.stats.records_published = self.aggregator.published();
            self.stats.publish_failures = self.aggregator.failures();
        }
    }

    /// Pull bytes until the source fails or `max_records` have been emitted.
    ///
    /// # Errors
    /// Source errors (including end of stream) are returned unchanged; the
    /// totals so far remain available through [`GyroEngine::stats`].
    #[instrument(name = "gyro_engine_run", skip(self, source), fields(source = source.name()))]
    pub fn run(
        &mut self,
        source: &mut dyn ByteSource,
        max_records: Option<u64>,
    ) -> Result<EngineStats, ContractError> {
        info!(
            nsamples = self.aggregator.nsamples(),
            max_records, "gyro engine started"
        );

        loop {
            if let Some(limit) = max_records {
                if self.stats.records_emitted() >= limit {
                    info!(records = self.stats.records_emitted(), "record limit reached");
                    return Ok(self.stats);
                }
            }

            let byte = match source.next_byte() {
                Ok(byte) => byte,
                Err(e) => {
                    warn!(
                        error = %e,
                        bytes = self.stats.bytes,
                        records = self.stats.records_published,
                        "byte source ended"
                    );
                    return Err(e);
                }
            };
            let now = self.clock.now_utime();
            self.feed(byte, now);
        }
    }
}
