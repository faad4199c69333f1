//! Pipeline orchestrator - coordinates all components.
//!
//! The engine pulls bytes on a blocking thread and hands finished records to
//! the async dispatcher through a bounded channel.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{ByteSource, ContractError, GyroBlueprint, TimeCorrelator};
use dispatcher::ChannelPublisher;
use ingestion::IngestionMetrics;
use sync_engine::{EngineStats, GyroEngine, PhaseTimeSync};
use tracing::{info, warn};

use super::{EndReason, PipelineStats};
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: GyroBlueprint,

    /// Maximum number of records to emit (None = unlimited)
    pub max_records: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Engine to dispatcher channel capacity
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

/// What the blocking engine thread hands back
struct EngineOutcome {
    stats: EngineStats,
    timesync_resyncs: u64,
    result: Result<(), ContractError>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the source ends, a limit is hit or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        // Byte source
        let ingestion_metrics = Arc::new(IngestionMetrics::new());
        let source = ingestion::open_source(&blueprint.source, Arc::clone(&ingestion_metrics))
            .map_err(|e| CliError::source_open(blueprint.source.kind(), e.to_string()))?;
        let stop = Arc::new(AtomicBool::new(false));
        let source = StoppableSource::new(source, Arc::clone(&stop));

        // Dispatcher
        if blueprint.sinks.is_empty() {
            warn!("no sinks configured - records will be dropped");
        }
        let (publisher, record_rx) =
            ChannelPublisher::channel(blueprint.channel.clone(), self.config.buffer_size);
        let dispatcher =
            dispatcher::create_dispatcher(blueprint.sinks.clone(), &blueprint.channel, record_rx)
                .await
                .context("Failed to create dispatcher")?;
        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();

        info!(
            source = blueprint.source.kind(),
            channel = %blueprint.channel,
            nsamples = blueprint.engine.aggregator.nsamples,
            active_sinks,
            max_records = ?self.config.max_records,
            "pipeline running"
        );

        // Engine
        let engine_config = blueprint.engine.clone();
        let max_records = self.config.max_records;
        let mut engine_task = tokio::task::spawn_blocking(move || {
            run_engine(engine_config, source, publisher, max_records)
        });

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };

        let first = tokio::select! {
            joined = &mut engine_task => Ok(joined),
            _ = shutdown => Err(EndReason::Interrupted),
            _ = deadline => Err(EndReason::TimedOut),
        };
        let (joined, end_reason) = match first {
            Ok(joined) => (joined, None),
            Err(reason) => {
                warn!(reason = %reason, "stopping engine...");
                stop.store(true, Ordering::SeqCst);
                (engine_task.await, Some(reason))
            }
        };
        let outcome = joined.map_err(|e| CliError::pipeline_execution(e.to_string()))?;

        // Publisher is gone with the engine thread; wait for sinks to drain
        info!("engine stopped, draining dispatcher...");
        let records = match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await
        {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => return Err(CliError::shutdown(e.to_string()).into()),
            Err(_) => {
                warn!("dispatcher did not drain within 5s");
                Default::default()
            }
        };

        let end_reason = match (end_reason, outcome.result) {
            (Some(reason), _) => reason,
            (None, Ok(())) => EndReason::RecordLimit,
            (None, Err(e)) if e.is_stream_closed() && blueprint.source.is_finite() => {
                EndReason::EndOfStream
            }
            (None, Err(e)) => return Err(CliError::pipeline_execution(e.to_string()).into()),
        };

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            end_reason,
            engine: outcome.stats,
            timesync_resyncs: outcome.timesync_resyncs,
            ingestion: ingestion_metrics.snapshot(),
            active_sinks,
            records,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            records = stats.engine.records_published,
            end = %stats.end_reason,
            "pipeline shutdown complete"
        );

        Ok(stats)
    }
}

fn run_engine(
    config: contracts::EngineConfig,
    mut source: StoppableSource,
    mut publisher: ChannelPublisher,
    max_records: Option<u64>,
) -> EngineOutcome {
    let mut correlator = PhaseTimeSync::new(&config.timesync);
    let (stats, result) = {
        let mut engine = GyroEngine::new(&config, &mut correlator, &mut publisher);
        let result = engine.run(&mut source, max_records);
        (engine.stats(), result.map(|_| ()))
    };
    EngineOutcome {
        stats,
        timesync_resyncs: correlator.resync_count(),
        result,
    }
}

/// Byte source that reports end of stream once `stop` is raised
struct StoppableSource {
    inner: Box<dyn ByteSource>,
    stop: Arc<AtomicBool>,
}

impl StoppableSource {
    fn new(inner: Box<dyn ByteSource>, stop: Arc<AtomicBool>) -> Self {
        Self { inner, stop }
    }
}

impl ByteSource for StoppableSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn next_byte(&mut self) -> Result<u8, ContractError> {
        if self.stop.load(Ordering::Relaxed) {
            return Err(ContractError::stream_closed(self.inner.name()));
        }
        self.inner.next_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MockSourceConfig, SinkConfig, SinkType, SourceConfig};
    use std::collections::HashMap;

    fn mock_pipeline(frames: Option<u64>, sinks: Vec<SinkConfig>) -> PipelineConfig {
        PipelineConfig {
            blueprint: GyroBlueprint {
                source: SourceConfig::Mock(MockSourceConfig {
                    frames,
                    rate_hz: None,
                    ..Default::default()
                }),
                sinks,
                ..Default::default()
            },
            max_records: None,
            timeout: None,
            buffer_size: 64,
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn finite_mock_runs_to_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let sinks = vec![SinkConfig {
            name: "jsonl".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 1024,
            params: HashMap::from([("path".to_string(), path.display().to_string())]),
        }];

        let pipeline = Pipeline::new(mock_pipeline(Some(600), sinks));
        let stats = pipeline.run(std::future::pending()).await.unwrap();

        assert_eq!(stats.end_reason, EndReason::EndOfStream);
        assert_eq!(stats.engine.bytes, 600 * 6);
        assert_eq!(stats.engine.locks, 1);
        assert!(stats.engine.records_published > 0);
        assert_eq!(stats.records.total_records, stats.engine.records_published);

        let lines = std::fs::read_to_string(&path).unwrap().lines().count() as u64;
        assert_eq!(lines, stats.engine.records_published);
    }

    #[tokio::test]
    async fn record_limit_stops_unbounded_mock() {
        let mut config = mock_pipeline(None, Vec::new());
        config.max_records = Some(20);

        let stats = Pipeline::new(config)
            .run(std::future::pending())
            .await
            .unwrap();
        assert_eq!(stats.end_reason, EndReason::RecordLimit);
        assert_eq!(stats.engine.records_emitted(), 20);
    }

    #[tokio::test]
    async fn shutdown_signal_stops_engine() {
        let config = mock_pipeline(None, Vec::new());
        let shutdown = tokio::time::sleep(Duration::from_millis(50));

        let stats = Pipeline::new(config).run(shutdown).await.unwrap();
        assert_eq!(stats.end_reason, EndReason::Interrupted);
    }

    #[tokio::test]
    async fn missing_device_is_reported() {
        let mut config = mock_pipeline(None, Vec::new());
        config.blueprint.source = SourceConfig::Device {
            path: "/nonexistent/ttyKVH".into(),
        };

        let err = Pipeline::new(config)
            .run(std::future::pending())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("device"), "got: {err}");
    }
}
