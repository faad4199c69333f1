//! # Sync Engine
//!
//! 陀螺仪字节流的帧同步与采样聚合引擎。
//!
//! 负责：
//! - 基于 2-bit 相位码的帧锁定（Startup → Acquire1 → Acquire2 → Locked）
//! - 帧解码（有效位、22-bit 有符号角速率）
//! - N 采样平均并发布 `GyroRecord`
//! - 相位计数与主机时间的 AdaKF 时间关联
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{EngineConfig, GyroEngine, PhaseTimeSync};
//!
//! let config = EngineConfig::default();
//! let mut correlator = PhaseTimeSync::new(&config.timesync);
//! let mut engine = GyroEngine::new(&config, &mut correlator, &mut sink);
//!
//! // Blocks until the source fails or closes
//! let result = engine.run(&mut source, None);
//! ```

mod adakf;
mod aggregator;
mod decoder;
mod engine;
mod synchronizer;
mod timesync;

#[cfg(test)]
mod test_support;

// Re-exports
pub use aggregator::{rate_to_rads, SampleAggregator, DEG_PER_S_PER_LSB};
pub use contracts::{
    AdaKFConfig, AggregatorConfig, EngineConfig, FrameSyncConfig, TimeSyncConfig,
};
pub use decoder::{decode_frame, sign_extend, FrameDecoder, DIAGNOSTIC_INTERVAL_US};
pub use engine::{EngineStats, GyroEngine};
pub use synchronizer::{FrameSynchronizer, SyncEvent};
pub use timesync::PhaseTimeSync;

// Re-export contracts types
pub use contracts::{DecodedSample, GyroRecord, Phase, RawFrame, SyncState};
