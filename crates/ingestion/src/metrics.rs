//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Bytes between exported counter updates
const EXPORT_BATCH: u64 = 1024;

/// Ingestion metrics
///
/// Shared between the byte source (blocking thread) and the reporting side.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total bytes handed to the engine
    pub bytes_received: AtomicU64,

    /// Read failures
    pub read_errors: AtomicU64,

    /// Synthetic frames generated
    pub frames_generated: AtomicU64,

    /// Capture replays restarted from the beginning
    pub replay_loops: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one byte received
    pub fn record_byte(&self) {
        let total = self.bytes_received.fetch_add(1, Ordering::Relaxed) + 1;
        if total % EXPORT_BATCH == 0 {
            counter!("gyro_sync_bytes_received_total").increment(EXPORT_BATCH);
        }
    }

    /// Record read error
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
        counter!("gyro_sync_read_errors_total").increment(1);
    }

    /// Record synthetic frame
    pub fn record_frame_generated(&self) {
        self.frames_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record replay restart
    pub fn record_replay_loop(&self) {
        self.replay_loops.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            frames_generated: self.frames_generated.load(Ordering::Relaxed),
            replay_loops: self.replay_loops.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total bytes handed to the engine
    pub bytes_received: u64,

    /// Read failures
    pub read_errors: u64,

    /// Synthetic frames generated
    pub frames_generated: u64,

    /// Capture replays restarted
    pub replay_loops: u64,
}
