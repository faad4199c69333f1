//! Layered error definitions
//!
//! Categorized by source: config / stream / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Byte Stream Errors =====
    /// The byte source reached end of stream
    #[error("byte source '{source_name}' closed")]
    StreamClosed { source_name: String },

    /// The byte source failed while reading
    #[error("byte source '{source_name}' read error")]
    StreamRead {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create stream closed error
    pub fn stream_closed(source_name: impl Into<String>) -> Self {
        Self::StreamClosed {
            source_name: source_name.into(),
        }
    }

    /// Create stream read error
    pub fn stream_read(source_name: impl Into<String>, source: std::io::Error) -> Self {
        Self::StreamRead {
            source_name: source_name.into(),
            source,
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error marks the end of the byte stream
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, Self::StreamClosed { .. })
    }
}
