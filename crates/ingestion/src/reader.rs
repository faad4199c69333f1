//! `Read`-backed byte sources: device nodes, files and stdin.

use std::fs::File;
use std::io::{self, BufReader, Read, Stdin};
use std::path::Path;
use std::sync::Arc;

use contracts::{ByteSource, ContractError};
use tracing::info;

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;

/// Buffered byte source over any reader
///
/// The serial line is expected to be configured already; this only reads.
pub struct ReaderSource<R> {
    name: String,
    bytes: io::Bytes<BufReader<R>>,
    metrics: Arc<IngestionMetrics>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(name: impl Into<String>, reader: R, metrics: Arc<IngestionMetrics>) -> Self {
        Self {
            name: name.into(),
            bytes: BufReader::new(reader).bytes(),
            metrics,
        }
    }
}

impl ReaderSource<File> {
    /// Open a device node or file for reading
    pub fn open(path: &Path, metrics: Arc<IngestionMetrics>) -> Result<Self> {
        let file = File::open(path).map_err(|source| IngestionError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "byte source opened");
        Ok(Self::new(path.display().to_string(), file, metrics))
    }
}

impl ReaderSource<Stdin> {
    pub fn stdin(metrics: Arc<IngestionMetrics>) -> Self {
        Self::new("stdin", io::stdin(), metrics)
    }
}

impl<R: Read + Send> ByteSource for ReaderSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_byte(&mut self) -> std::result::Result<u8, ContractError> {
        match self.bytes.next() {
            Some(Ok(byte)) => {
                self.metrics.record_byte();
                Ok(byte)
            }
            Some(Err(e)) => {
                self.metrics.record_read_error();
                Err(ContractError::stream_read(&self.name, e))
            }
            None => Err(ContractError::stream_closed(&self.name)),
        }
    }
}
