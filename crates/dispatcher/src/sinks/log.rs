//! LogSink - logs record summaries via tracing

use std::collections::HashMap;

use chrono::DateTime;
use contracts::{ContractError, DataSink, GyroRecord};
use tracing::{info, instrument};

use crate::error::DispatcherError;

/// Sink that logs record summaries for debugging
pub struct LogSink {
    name: String,
    channel: String,
    /// Log one record out of every `every`
    every: u64,
    seen: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: channel.into(),
            every: 1,
            seen: 0,
        }
    }

    /// Create from params map (`every`, default 1)
    pub fn from_params(
        name: impl Into<String>,
        channel: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let every = match params.get("every") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    DispatcherError::invalid_param(
                        "every",
                        format!("expected positive integer, got '{raw}'"),
                    )
                })?,
            None => 1,
        };
        Ok(Self {
            every,
            ..Self::new(name, channel)
        })
    }

    fn log_record_summary(&self, record: &GyroRecord) {
        let time = DateTime::from_timestamp_micros(record.utime)
            .map(|t| t.format("%H:%M:%S%.6f").to_string())
            .unwrap_or_else(|| record.utime.to_string());

        info!(
            sink = %self.name,
            channel = %self.channel,
            time = %time,
            utime = record.utime,
            rads = record.rads,
            nsamples = record.nsamples,
            "GyroRecord received"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, record),
        fields(sink = %self.name, utime = record.utime)
    )]
    async fn write(&mut self, record: &GyroRecord) -> Result<(), ContractError> {
        if self.seen % self.every == 0 {
            self.log_record_summary(record);
        }
        self.seen += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, records = self.seen, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log", "KVH");
        let record = GyroRecord {
            utime: 1_700_000_000_123_456,
            rads: 0.01,
            nsamples: 2,
            samples: vec![1, 2],
        };

        assert!(sink.write(&record).await.is_ok());
        assert!(sink.write(&record).await.is_ok());
        assert_eq!(sink.seen, 2);
    }

    #[test]
    fn test_log_sink_params() {
        let mut params = HashMap::new();
        params.insert("every".to_string(), "100".to_string());
        let sink = LogSink::from_params("sampled", "KVH", &params).unwrap();
        assert_eq!(sink.every, 100);
        assert_eq!(sink.name(), "sampled");

        params.insert("every".to_string(), "0".to_string());
        assert!(matches!(
            LogSink::from_params("sampled", "KVH", &params),
            Err(DispatcherError::InvalidParam { .. })
        ));
    }
}
