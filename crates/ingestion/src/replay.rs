//! Capture replay
//!
//! Serves a recorded byte stream from memory, optionally looping.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use contracts::{ByteSource, ContractError};
use tracing::{debug, info};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;

/// In-memory capture source
pub struct ReplaySource {
    name: String,
    data: Bytes,
    pos: usize,
    loop_playback: bool,
    loops: u64,
    metrics: Arc<IngestionMetrics>,
}

impl ReplaySource {
    /// Serve `data` as a byte stream.
    ///
    /// Looping an empty capture would never yield a byte and is rejected.
    pub fn from_bytes(
        name: impl Into<String>,
        data: impl Into<Bytes>,
        loop_playback: bool,
        metrics: Arc<IngestionMetrics>,
    ) -> Result<Self> {
        let name = name.into();
        let data = data.into();
        if loop_playback && data.is_empty() {
            return Err(IngestionError::EmptyCapture { name });
        }
        Ok(Self {
            name,
            data,
            pos: 0,
            loop_playback,
            loops: 0,
            metrics,
        })
    }

    /// Load a capture file fully into memory
    pub fn load(path: &Path, loop_playback: bool, metrics: Arc<IngestionMetrics>) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| IngestionError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = %path.display(),
            bytes = data.len(),
            loop_playback,
            "capture loaded"
        );
        Self::from_bytes(path.display().to_string(), data, loop_playback, metrics)
    }

    /// Capture length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Completed passes over the capture
    pub fn loops(&self) -> u64 {
        self.loops
    }
}

impl ByteSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_byte(&mut self) -> std::result::Result<u8, ContractError> {
        if self.pos == self.data.len() {
            if !self.loop_playback {
                return Err(ContractError::stream_closed(&self.name));
            }
            self.pos = 0;
            self.loops += 1;
            self.metrics.record_replay_loop();
            debug!(loops = self.loops, "capture rewound");
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        self.metrics.record_byte();
        Ok(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plays_once_without_loop() {
        let metrics = Arc::new(IngestionMetrics::new());
        let mut source =
            ReplaySource::from_bytes("mem", vec![1u8, 2], false, metrics.clone()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.next_byte().unwrap(), 1);
        assert_eq!(source.next_byte().unwrap(), 2);
        assert!(source.next_byte().unwrap_err().is_stream_closed());
        assert_eq!(metrics.snapshot().bytes_received, 2);
    }

    #[test]
    fn loops_when_enabled() {
        let metrics = Arc::new(IngestionMetrics::new());
        let mut source =
            ReplaySource::from_bytes("mem", Bytes::from_static(&[5, 6]), true, metrics.clone())
                .unwrap();
        let bytes: Vec<u8> = (0..5).map(|_| source.next_byte().unwrap()).collect();
        assert_eq!(bytes, vec![5, 6, 5, 6, 5]);
        assert_eq!(source.loops(), 2);
        assert_eq!(metrics.snapshot().replay_loops, 2);
    }

    #[test]
    fn empty_loop_rejected() {
        let result = ReplaySource::from_bytes("mem", Vec::new(), true, Arc::default());
        assert!(matches!(result, Err(IngestionError::EmptyCapture { .. })));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kvh.bin");
        std::fs::write(&path, [1, 2, 3]).unwrap();

        let mut source = ReplaySource::load(&path, false, Arc::default()).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.next_byte().unwrap(), 1);
    }
}
