//! ChannelPublisher - bridges the blocking engine loop to the async dispatcher

use contracts::{ContractError, GyroRecord, RecordSink};
use tokio::sync::mpsc;
use tracing::debug;

/// `RecordSink` that forwards records into a tokio channel.
///
/// Blocks while the channel is full, so it must be driven from a blocking
/// thread (e.g. `spawn_blocking`), never from inside an async task.
pub struct ChannelPublisher {
    name: String,
    tx: mpsc::Sender<GyroRecord>,
}

impl ChannelPublisher {
    pub fn new(name: impl Into<String>, tx: mpsc::Sender<GyroRecord>) -> Self {
        Self {
            name: name.into(),
            tx,
        }
    }

    /// Create a publisher together with the receiving end
    pub fn channel(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<GyroRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(name, tx), rx)
    }
}

impl RecordSink for ChannelPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&mut self, record: &GyroRecord) -> Result<(), ContractError> {
        self.tx.blocking_send(record.clone()).map_err(|_| {
            debug!(publisher = %self.name, "dispatcher channel closed");
            ContractError::sink_connection(&self.name, "dispatcher channel closed")
        })
    }
}
