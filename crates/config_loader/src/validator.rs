//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (`validator` 派生规则)
//! - 字节来源路径非空，Mock 参数合法
//! - sink 名称唯一，类型必需参数齐全

use std::collections::HashSet;

use contracts::{ContractError, GyroBlueprint, SinkType, SourceConfig, FRAME_LEN};
use ::validator::Validate;

/// 校验 GyroBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &GyroBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_source(&blueprint.source)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 派生的字段范围规则
fn validate_fields(blueprint: &GyroBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

fn validate_source(source: &SourceConfig) -> Result<(), ContractError> {
    match source {
        SourceConfig::Device { path } | SourceConfig::File { path, .. } => {
            if path.as_os_str().is_empty() {
                return Err(ContractError::config_validation(
                    "source.path",
                    "path cannot be empty",
                ));
            }
        }
        SourceConfig::Stdin => {}
        SourceConfig::Mock(mock) => {
            if mock.start_offset >= FRAME_LEN {
                return Err(ContractError::config_validation(
                    "source.start_offset",
                    format!(
                        "start_offset must be < {FRAME_LEN}, got {}",
                        mock.start_offset
                    ),
                ));
            }
            if let Some(rate) = mock.rate_hz {
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(ContractError::config_validation(
                        "source.rate_hz",
                        format!("rate_hz must be > 0, got {rate}"),
                    ));
                }
            }
            if mock.noise < 0 {
                return Err(ContractError::config_validation(
                    "source.noise",
                    format!("noise must be >= 0, got {}", mock.noise),
                ));
            }
            for (field, every) in [
                ("source.invalid_every", mock.invalid_every),
                ("source.corrupt_every", mock.corrupt_every),
            ] {
                if every == Some(0) {
                    return Err(ContractError::config_validation(field, "must be >= 1"));
                }
            }
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &GyroBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.sink_type == SinkType::Network && !sink.params.contains_key("addr") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.addr", sink.name),
                "network sink requires 'addr'",
            ));
        }
    }
    Ok(())
}
