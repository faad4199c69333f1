//! Ingestion 错误类型

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 字节源打开失败
    #[error("failed to open byte source {path:?}")]
    OpenFailed {
        /// 设备或文件路径
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 循环回放的捕获数据为空
    #[error("capture {name} is empty and cannot be looped")]
    EmptyCapture {
        /// 源名称
        name: String,
    },

    /// 合成数据源配置无效
    #[error("invalid mock source config: {message}")]
    InvalidMock {
        /// 错误消息
        message: String,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
