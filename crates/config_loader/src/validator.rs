//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个输出，输出名称非空且唯一
//! - 每个输出、过滤器至少绑定一个 kind
//! - 缓冲参数：flush_interval_ms / logs_per_flush > 0，可选上限 > 0
//! - network 输出的 addr 合法
//! - 过滤器必填参数齐全
//! - file 存储路径非空

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{
    BufferSettings, ContractError, FilterConfig, FilterType, OutputConfig, ShipperBlueprint,
    SinkType, StoreConfig,
};

/// 校验 ShipperBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ShipperBlueprint) -> Result<(), ContractError> {
    validate_store(&blueprint.store)?;
    validate_output_names(blueprint)?;
    for output in &blueprint.outputs {
        validate_output(output)?;
    }
    for (idx, filter) in blueprint.filters.iter().enumerate() {
        validate_filter(idx, filter)?;
    }
    Ok(())
}

/// 校验存储配置
fn validate_store(store: &StoreConfig) -> Result<(), ContractError> {
    if let StoreConfig::File { path, .. } = store {
        if path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                "store.path",
                "file store path cannot be empty",
            ));
        }
    }
    Ok(())
}

/// 校验输出名称唯一性
fn validate_output_names(blueprint: &ShipperBlueprint) -> Result<(), ContractError> {
    if blueprint.outputs.is_empty() {
        return Err(ContractError::config_validation(
            "outputs",
            "at least one output is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, output) in blueprint.outputs.iter().enumerate() {
        if output.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("outputs[{}].name", idx),
                "output name cannot be empty",
            ));
        }
        if !seen.insert(&output.name) {
            return Err(ContractError::config_validation(
                format!("outputs[name={}]", output.name),
                "duplicate output name",
            ));
        }
    }
    Ok(())
}

/// 校验单个输出
fn validate_output(output: &OutputConfig) -> Result<(), ContractError> {
    validate_kinds(&format!("outputs[{}].kinds", output.name), &output.kinds)?;

    if let Some(buffer) = &output.buffer {
        validate_buffer(&output.name, buffer)?;
    }

    if output.sink_type == SinkType::Network {
        let field = format!("outputs[{}].params.addr", output.name);
        let addr = output
            .params
            .get("addr")
            .ok_or_else(|| ContractError::config_validation(&field, "network output requires addr"))?;
        addr.parse::<SocketAddr>().map_err(|e| {
            ContractError::config_validation(&field, format!("invalid address '{}': {}", addr, e))
        })?;

        if let Some(size) = output.params.get("max_packet_size") {
            size.parse::<usize>().map_err(|e| {
                ContractError::config_validation(
                    format!("outputs[{}].params.max_packet_size", output.name),
                    format!("invalid max_packet_size '{}': {}", size, e),
                )
            })?;
        }
    }
    Ok(())
}

/// 校验缓冲参数
fn validate_buffer(name: &str, buffer: &BufferSettings) -> Result<(), ContractError> {
    let field = |key: &str| format!("outputs[{}].buffer.{}", name, key);

    if buffer.flush_interval_ms == 0 {
        return Err(ContractError::config_validation(
            field("flush_interval_ms"),
            "flush_interval_ms must be > 0",
        ));
    }
    if buffer.logs_per_flush == 0 {
        return Err(ContractError::config_validation(
            field("logs_per_flush"),
            "logs_per_flush must be > 0",
        ));
    }
    if buffer.purgeable_age_ms == Some(0) {
        return Err(ContractError::config_validation(
            field("purgeable_age_ms"),
            "purgeable_age_ms must be > 0 when set",
        ));
    }
    if buffer.max_flush_size_in_bytes == Some(0) {
        return Err(ContractError::config_validation(
            field("max_flush_size_in_bytes"),
            "max_flush_size_in_bytes must be > 0 when set",
        ));
    }
    Ok(())
}

/// 校验过滤器
fn validate_filter(idx: usize, filter: &FilterConfig) -> Result<(), ContractError> {
    validate_kinds(&format!("filters[{}].kinds", idx), &filter.kinds)?;

    let required: &[&str] = match filter.filter_type {
        FilterType::AddTime => &[],
        FilterType::RemoveKeys => &["keys"],
        FilterType::KeepIf => &["key", "value"],
    };
    for key in required {
        if filter.params.get(*key).map_or(true, |v| v.is_empty()) {
            return Err(ContractError::config_validation(
                format!("filters[{}].params.{}", idx, key),
                format!("{:?} filter requires '{}'", filter.filter_type, key),
            ));
        }
    }
    Ok(())
}

/// 至少一个非空 kind
fn validate_kinds(field: &str, kinds: &[String]) -> Result<(), ContractError> {
    if kinds.is_empty() {
        return Err(ContractError::config_validation(
            field,
            "at least one kind is required",
        ));
    }
    if kinds.iter().any(|kind| kind.is_empty()) {
        return Err(ContractError::config_validation(field, "kind cannot be empty"));
    }
    Ok(())
}
