//! Sink traits - record output interfaces
//!
//! `RecordSink` is the synchronous publisher the engine calls inline;
//! `DataSink` is the async interface the dispatcher fans records out to.

use crate::{ContractError, GyroRecord};

/// Synchronous publisher
///
/// Called from the engine loop; a slow implementation stalls byte
/// consumption.
pub trait RecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Publish one record
    ///
    /// # Errors
    /// Returns publish error; the engine logs and counts it.
    fn publish(&mut self, record: &GyroRecord) -> Result<(), ContractError>;
}

/// Data output trait
///
/// All dispatcher sink implementations must implement this trait.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one record
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, record: &GyroRecord) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
