//! ShipperBlueprint - Config Loader 输出
//!
//! 描述一个完整的投递配置：存储后端、过滤器、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::BufferedOutputConfig;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的投递配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 缓冲存储后端
    #[serde(default)]
    pub store: StoreConfig,

    /// 过滤器 (按声明顺序追加到各 kind 的过滤链)
    #[serde(default)]
    pub filters: Vec<FilterConfig>,

    /// 输出路由配置
    pub outputs: Vec<OutputConfig>,
}

impl ShipperBlueprint {
    /// 所有被引用的 kind (去重，保持首次出现顺序)
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = Vec::new();
        let referenced = self
            .filters
            .iter()
            .flat_map(|f| f.kinds.iter())
            .chain(self.outputs.iter().flat_map(|o| o.kinds.iter()));
        for kind in referenced {
            if !kinds.contains(&kind.as_str()) {
                kinds.push(kind);
            }
        }
        kinds
    }
}

/// 存储后端配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// 进程内存 (重启丢失)
    #[default]
    Memory,
    /// 目录下每个输出一个 JSON-lines 文件
    File {
        /// 存储目录
        path: PathBuf,
        /// 每次追加后 fsync
        #[serde(default = "default_sync_writes")]
        sync_writes: bool,
    },
}

fn default_sync_writes() -> bool {
    true
}

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出名称 (缓冲输出的存储分区 id)
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 绑定的 kind 列表
    pub kinds: Vec<String>,

    /// Sink 参数
    #[serde(default)]
    pub params: HashMap<String, String>,

    /// 缓冲参数；存在时该输出为缓冲输出
    #[serde(default)]
    pub buffer: Option<BufferSettings>,
}

impl OutputConfig {
    /// 是否为缓冲输出
    pub fn is_buffered(&self) -> bool {
        self.buffer.is_some() || self.sink_type.is_batch_only()
    }

    /// 缓冲参数 (缺省时使用默认值)
    pub fn buffered_output_config(&self) -> BufferedOutputConfig {
        self.buffer.clone().unwrap_or_default().to_output_config()
    }
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// tracing 日志输出 (即时或缓冲)
    Log,
    /// JSON-lines 文件输出 (仅缓冲)
    File,
    /// UDP 输出 (仅缓冲)
    Network,
}

impl SinkType {
    /// 只能作为缓冲输出使用
    pub fn is_batch_only(self) -> bool {
        matches!(self, SinkType::File | SinkType::Network)
    }
}

/// 缓冲参数，时间单位为毫秒
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSettings {
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_logs_per_flush")]
    pub logs_per_flush: usize,

    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// 负值取绝对值
    #[serde(default = "default_exponential_backoff_base_ms")]
    pub exponential_backoff_base_ms: i64,

    #[serde(default)]
    pub purgeable_age_ms: Option<u64>,

    #[serde(default)]
    pub max_flush_size_in_bytes: Option<u64>,
}

fn default_flush_interval_ms() -> u64 {
    120_000
}

fn default_logs_per_flush() -> usize {
    100
}

fn default_max_retry_count() -> u32 {
    5
}

fn default_exponential_backoff_base_ms() -> i64 {
    2_000
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            logs_per_flush: default_logs_per_flush(),
            max_retry_count: default_max_retry_count(),
            exponential_backoff_base_ms: default_exponential_backoff_base_ms(),
            purgeable_age_ms: None,
            max_flush_size_in_bytes: None,
        }
    }
}

impl BufferSettings {
    /// 转换为运行时参数
    pub fn to_output_config(&self) -> BufferedOutputConfig {
        BufferedOutputConfig {
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            logs_per_flush: self.logs_per_flush,
            max_retry_count: self.max_retry_count,
            exponential_backoff_base: Duration::from_millis(
                self.exponential_backoff_base_ms.unsigned_abs(),
            ),
            purgeable_age: self.purgeable_age_ms.map(Duration::from_millis),
            max_flush_size_in_bytes: self.max_flush_size_in_bytes,
        }
    }
}

/// 过滤器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// 过滤器类型
    pub filter_type: FilterType,

    /// 应用到的 kind 列表
    pub kinds: Vec<String>,

    /// 过滤器参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// 内置过滤器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// 添加毫秒时间戳 (params: key, 默认 "time")
    AddTime,
    /// 删除字段 (params: keys, 逗号分隔)
    RemoveKeys,
    /// 字段不等于给定值时丢弃 (params: key, value)
    KeepIf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_settings_defaults_match_runtime_defaults() {
        assert_eq!(
            BufferSettings::default().to_output_config(),
            BufferedOutputConfig::default()
        );
    }

    #[test]
    fn test_negative_backoff_base_is_absolute() {
        let settings = BufferSettings {
            exponential_backoff_base_ms: -1_500,
            ..Default::default()
        };
        assert_eq!(
            settings.to_output_config().exponential_backoff_base,
            Duration::from_millis(1_500)
        );
    }

    #[test]
    fn test_log_output_is_immediate_without_buffer() {
        let output = OutputConfig {
            name: "console".into(),
            sink_type: SinkType::Log,
            kinds: vec!["click".into()],
            params: HashMap::new(),
            buffer: None,
        };
        assert!(!output.is_buffered());

        let file = OutputConfig {
            sink_type: SinkType::File,
            ..output
        };
        assert!(file.is_buffered());
    }
}
