//! Pipeline statistics and metrics.

use std::fmt;
use std::time::Duration;

use ingestion::MetricsSnapshot;
use observability::GyroMetricsAggregator;
use sync_engine::EngineStats;

/// Why a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Finite source reached its end
    EndOfStream,
    /// `--max-records` reached
    RecordLimit,
    /// `--timeout` elapsed
    TimedOut,
    /// Ctrl+C / SIGTERM
    Interrupted,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::EndOfStream => "end of stream",
            EndReason::RecordLimit => "record limit",
            EndReason::TimedOut => "timeout",
            EndReason::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub duration: Duration,
    pub end_reason: EndReason,
    /// Engine totals
    pub engine: EngineStats,
    /// Time sync filter restarts
    pub timesync_resyncs: u64,
    /// Byte source counters
    pub ingestion: MetricsSnapshot,
    pub active_sinks: usize,
    /// Records seen by the dispatcher
    pub records: GyroMetricsAggregator,
}

impl PipelineStats {
    /// Published records per second of wall time
    pub fn record_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.engine.records_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Invalid samples as a percentage of decoded frames
    pub fn invalid_rate(&self) -> f64 {
        if self.engine.frames > 0 {
            (self.engine.invalid_samples as f64 / self.engine.frames as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Gyro Pipeline Statistics                ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s ({})", self.duration.as_secs_f64(), self.end_reason);
        println!("   ├─ Bytes received: {}", self.ingestion.bytes_received);
        println!("   ├─ Records published: {}", self.engine.records_published);
        println!("   ├─ Record rate: {:.2} Hz", self.record_rate());
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\n🔒 Frame Sync");
        println!("   ├─ Frames: {}", self.engine.frames);
        println!("   ├─ Locks acquired: {}", self.engine.locks);
        println!("   ├─ Sync lost: {}", self.engine.lost_sync);
        println!(
            "   ├─ Invalid samples: {} ({:.2}%)",
            self.engine.invalid_samples,
            self.invalid_rate()
        );
        println!("   ├─ Publish failures: {}", self.engine.publish_failures);
        println!("   └─ Time sync resyncs: {}", self.timesync_resyncs);

        if self.ingestion.read_errors > 0 || self.ingestion.replay_loops > 0 {
            println!("\n📥 Source");
            println!("   ├─ Read errors: {}", self.ingestion.read_errors);
            println!("   └─ Replay loops: {}", self.ingestion.replay_loops);
        }

        println!("\n{}", self.records.summary());
    }
}
