//! Dispatcher - main loop for fan-out to sinks

use observability::GyroMetricsAggregator;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{GyroRecord, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Channel name attached to outgoing records
    pub channel: String,
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<GyroRecord>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<GyroRecord>) -> Self {
        Self { config, input_rx }
    }

    /// Build and start the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config).await?;

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            handles.push(create_sink_handle(sink_config, &config.channel).await?);
        }
        Ok(handles)
    }
}

#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config, channel),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(
    config: &SinkConfig,
    channel: &str,
) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::from_params(&config.name, channel, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, channel, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Fans records out to every sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<GyroRecord>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<GyroRecord>) -> Self {
        Self { handles, input_rx }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns the aggregated record statistics once the input channel closes
    /// and every sink has drained.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> GyroMetricsAggregator {
        info!(sinks = self.handles.len(), "dispatcher started");

        let mut aggregator = GyroMetricsAggregator::new();

        while let Some(record) = self.input_rx.recv().await {
            aggregator.update(&record);
            self.dispatch_record(&record);

            if aggregator.total_records.is_multiple_of(1000) {
                debug!(records = aggregator.total_records, "dispatcher progress");
            }
        }

        info!(
            records = aggregator.total_records,
            "dispatcher input closed, shutting down"
        );

        let metrics = self.metrics();
        Self::shutdown_handles(self.handles).await;
        for (name, snapshot) in metrics {
            debug!(
                sink = %name,
                dropped = snapshot.dropped_count,
                "sink final queue state"
            );
        }

        info!("dispatcher shutdown complete");
        aggregator
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<GyroMetricsAggregator> {
        tokio::spawn(self.run())
    }

    fn dispatch_record(&self, record: &GyroRecord) {
        for handle in &self.handles {
            let queued = handle.try_send(record.clone());
            observability::record_record_dispatched(handle.name(), queued);
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) {
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    channel: &str,
    input_rx: mpsc::Receiver<GyroRecord>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        channel: channel.to_string(),
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(utime: i64) -> GyroRecord {
        GyroRecord {
            utime,
            rads: utime as f64 * 1e-3,
            nsamples: 2,
            samples: vec![1, 2],
        }
    }

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let handles = vec![
            SinkHandle::spawn(LogSink::new("sink1", "KVH"), 10),
            SinkHandle::spawn(LogSink::new("sink2", "KVH"), 10),
        ];

        let dispatcher = Dispatcher::with_handles(handles, input_rx);
        let handle = dispatcher.spawn();

        for i in 0..5 {
            input_tx.send(record(i * 6_000)).await.unwrap();
        }
        drop(input_tx);

        let aggregator = handle.await.unwrap();
        assert_eq!(aggregator.total_records, 5);
        assert_eq!(aggregator.total_samples, 10);
        assert_eq!(aggregator.non_monotonic, 0);
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let (input_tx, input_rx) = mpsc::channel(10);

        let configs = vec![
            SinkConfig {
                name: "test_log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "test_file".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 50,
                params: HashMap::from([("path".to_string(), path.display().to_string())]),
            },
        ];

        let dispatcher = create_dispatcher(configs, "KVH", input_rx).await.unwrap();
        assert_eq!(dispatcher.metrics().len(), 2);
        let handle = dispatcher.spawn();

        input_tx.send(record(1)).await.unwrap();
        input_tx.send(record(2)).await.unwrap();
        drop(input_tx);
        handle.await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_bad_network_params_fail_creation() {
        let (_input_tx, input_rx) = mpsc::channel(1);
        let configs = vec![SinkConfig {
            name: "udp".to_string(),
            sink_type: SinkType::Network,
            queue_capacity: 1,
            params: HashMap::new(),
        }];

        let result = create_dispatcher(configs, "KVH", input_rx).await;
        assert!(matches!(result, Err(DispatcherError::SinkCreation { .. })));
    }
}
