//! # Dispatcher
//!
//! 数据分发模块。
//!
//! 负责：
//! - 通过 `ChannelPublisher` 接收同步引擎产生的 `GyroRecord`
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞主链路

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod publisher;
pub mod sinks;

pub use contracts::{DataSink, GyroRecord};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use publisher::ChannelPublisher;
pub use sinks::{FileSink, LogSink, NetworkSink};
