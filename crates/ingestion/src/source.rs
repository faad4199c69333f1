//! Byte source construction from configuration

use std::sync::Arc;

use contracts::{ByteSource, SourceConfig};
use tracing::info;

use crate::error::Result;
use crate::metrics::IngestionMetrics;
use crate::mock::MockGyroSource;
use crate::reader::ReaderSource;
use crate::replay::ReplaySource;

/// Open the byte source described by `config`.
///
/// Device nodes and non-looping files are streamed; looping captures are
/// read into memory so they can be rewound.
pub fn open_source(
    config: &SourceConfig,
    metrics: Arc<IngestionMetrics>,
) -> Result<Box<dyn ByteSource>> {
    info!(kind = config.kind(), "opening byte source");

    let source: Box<dyn ByteSource> = match config {
        SourceConfig::Device { path } => Box::new(ReaderSource::open(path, metrics)?),
        SourceConfig::File {
            path,
            loop_playback: false,
        } => Box::new(ReaderSource::open(path, metrics)?),
        SourceConfig::File {
            path,
            loop_playback: true,
        } => Box::new(ReplaySource::load(path, true, metrics)?),
        SourceConfig::Stdin => Box::new(ReaderSource::stdin(metrics)),
        SourceConfig::Mock(mock) => Box::new(MockGyroSource::new(mock.clone(), metrics)?),
    };
    Ok(source)
}
