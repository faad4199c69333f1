//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, GyroBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<GyroBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<GyroBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<GyroBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkType, SourceConfig};
    use std::path::PathBuf;

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let bp = parse_toml("").unwrap();
        assert_eq!(bp, GyroBlueprint::default());
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
channel = "KVH_AFT"

[source]
kind = "file"
path = "captures/run1.bin"
loop_playback = true

[engine.frame_sync]
lock_threshold = 12
verbose = true

[engine.aggregator]
nsamples = 10

[engine.timesync]
nominal_rate_hz = 1000.0

[[sinks]]
name = "jsonl"
sink_type = "file"
queue_capacity = 500
params = { path = "out/gyro.jsonl" }
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.channel, "KVH_AFT");
        assert_eq!(
            bp.source,
            SourceConfig::File {
                path: PathBuf::from("captures/run1.bin"),
                loop_playback: true,
            }
        );
        assert_eq!(bp.engine.frame_sync.lock_threshold, 12);
        assert!(bp.engine.frame_sync.verbose);
        assert_eq!(bp.engine.aggregator.nsamples, 10);
        assert_eq!(bp.engine.timesync.nominal_rate_hz, 1000.0);
        assert_eq!(bp.engine.timesync.phase_wrap, 4);
        assert_eq!(bp.sinks.len(), 1);
        assert_eq!(bp.sinks[0].sink_type, SinkType::File);
        assert_eq!(bp.sinks[0].params["path"], "out/gyro.jsonl");
    }

    #[test]
    fn test_parse_json_mock_source() {
        let content = r#"{
            "source": { "kind": "mock", "frames": 600, "start_offset": 3, "rate_hz": null },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let bp = parse_json(content).unwrap();
        match bp.source {
            SourceConfig::Mock(mock) => {
                assert_eq!(mock.frames, Some(600));
                assert_eq!(mock.start_offset, 3);
                assert_eq!(mock.rate_hz, None);
            }
            other => panic!("expected mock source, got {other:?}"),
        }
        assert_eq!(bp.sinks[0].queue_capacity, 100);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_unknown_source_kind() {
        let result = parse_toml("[source]\nkind = \"carrier_pigeon\"\n");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("JSON"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
