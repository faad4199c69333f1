//! GyroBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：字节来源、引擎参数、发布通道、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use validator::Validate;

use crate::EngineConfig;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GyroBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 发布通道名称
    #[serde(default = "default_channel")]
    #[validate(length(min = 1))]
    pub channel: String,

    /// 字节来源
    #[serde(default)]
    pub source: SourceConfig,

    /// 引擎参数
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineConfig,

    /// 输出路由配置
    #[serde(default = "default_sinks")]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for GyroBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            channel: default_channel(),
            source: SourceConfig::default(),
            engine: EngineConfig::default(),
            sinks: default_sinks(),
        }
    }
}

fn default_channel() -> String {
    "KVH".to_string()
}

fn default_sinks() -> Vec<SinkConfig> {
    vec![SinkConfig {
        name: "log".to_string(),
        sink_type: SinkType::Log,
        queue_capacity: default_queue_capacity(),
        params: HashMap::new(),
    }]
}

/// 字节来源配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// 已配置好的串口设备节点
    Device { path: PathBuf },
    /// 捕获文件回放
    File {
        path: PathBuf,
        /// 到达末尾后从头重放
        #[serde(default)]
        loop_playback: bool,
    },
    /// 标准输入
    Stdin,
    /// 合成数据
    Mock(MockSourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Device {
            path: PathBuf::from("/dev/ttyUSB0"),
        }
    }
}

impl SourceConfig {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Device { .. } => "device",
            SourceConfig::File { .. } => "file",
            SourceConfig::Stdin => "stdin",
            SourceConfig::Mock(_) => "mock",
        }
    }

    /// Whether end of stream is an expected way for a run to finish
    pub fn is_finite(&self) -> bool {
        match self {
            SourceConfig::Device { .. } => false,
            SourceConfig::File { loop_playback, .. } => !loop_playback,
            SourceConfig::Stdin => true,
            SourceConfig::Mock(mock) => mock.frames.is_some(),
        }
    }
}

/// 合成数据源配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSourceConfig {
    /// 生成的帧数 (None = 无限)
    pub frames: Option<u64>,
    /// 流起始位于帧内的字节偏移 (0..6)
    pub start_offset: usize,
    /// 第一帧的相位
    pub start_phase: u8,
    /// 基准角速率 (LSB)
    pub base_rate: i32,
    /// 均匀噪声幅度 (LSB)
    pub noise: i32,
    /// 每 N 帧标记一帧无效
    pub invalid_every: Option<u64>,
    /// 每 N 帧破坏一次相位
    pub corrupt_every: Option<u64>,
    /// 输出帧率 (Hz)，None 表示不限速
    pub rate_hz: Option<f64>,
    /// 随机种子
    pub seed: u64,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            frames: None,
            start_offset: 0,
            start_phase: 0,
            base_rate: 0,
            noise: 40,
            invalid_every: None,
            corrupt_every: None,
            rate_hz: Some(989.0),
            seed: 42,
        }
    }
}

/// Sink 输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink 名称
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出 (JSON Lines)
    File,
    /// 网络输出 (UDP)
    Network,
}
