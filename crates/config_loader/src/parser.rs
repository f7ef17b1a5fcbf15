//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, ShipperBlueprint};

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

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<ShipperBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<ShipperBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<ShipperBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkType, StoreConfig};
    use std::path::PathBuf;

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[store]
type = "file"
path = "/var/lib/logship"

[[filters]]
filter_type = "add_time"
kinds = ["click", "view"]

[[outputs]]
name = "console"
sink_type = "log"
kinds = ["click"]

[[outputs]]
name = "archive"
sink_type = "file"
kinds = ["click", "view"]
params = { base_path = "./archive" }
[outputs.buffer]
flush_interval_ms = 5000
logs_per_flush = 20
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(
            bp.store,
            StoreConfig::File {
                path: PathBuf::from("/var/lib/logship"),
                sync_writes: true,
            }
        );
        assert_eq!(bp.filters.len(), 1);
        assert_eq!(bp.outputs.len(), 2);
        assert_eq!(bp.outputs[1].sink_type, SinkType::File);

        let buffer = bp.outputs[1].buffer.as_ref().unwrap();
        assert_eq!(buffer.flush_interval_ms, 5000);
        assert_eq!(buffer.logs_per_flush, 20);
        assert_eq!(buffer.max_retry_count, 5);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "outputs": [{ "name": "console", "sink_type": "log", "kinds": ["click"] }]
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.store, StoreConfig::Memory);
        assert!(bp.filters.is_empty());
        assert!(bp.outputs[0].buffer.is_none());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_sink_type() {
        let content = r#"
[[outputs]]
name = "x"
sink_type = "kafka"
kinds = ["click"]
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
