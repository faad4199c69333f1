//! # Ingestion
//!
//! Gyro byte stream ingestion module.
//!
//! Responsibilities:
//! - Open the configured byte source (serial device, capture file, stdin or mock)
//! - Deliver bytes one at a time through `ByteSource`
//! - Count received bytes and read errors
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{open_source, IngestionMetrics};
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(IngestionMetrics::new());
//! let mut source = open_source(&blueprint.source, metrics.clone())?;
//! let stats = engine.run(source.as_mut(), None)?;
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::FrameStreamBuilder;
//!
//! let capture = FrameStreamBuilder::new()
//!     .offset(3)
//!     .frames((0..64).map(|k| (true, k)))
//!     .build();
//! ```

mod error;
mod metrics;
mod mock;
mod reader;
mod replay;
mod source;

// Re-exports
pub use contracts::ByteSource;
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use mock::{FrameStreamBuilder, MockGyroSource};
pub use reader::ReaderSource;
pub use replay::ReplaySource;
pub use source::open_source;
