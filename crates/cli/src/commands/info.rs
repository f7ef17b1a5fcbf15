//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{BufferedOutputConfig, StoreConfig};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::cli::InfoArgs;
use config_loader::ShipperBlueprint;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    store: StoreConfig,
    kinds: Vec<String>,
    outputs: Vec<OutputInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<FilterInfo>,
}

#[derive(Serialize)]
struct OutputInfo {
    name: String,
    sink_type: String,
    buffered: bool,
    kinds: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer: Option<BufferInfo>,
}

#[derive(Serialize)]
struct BufferInfo {
    flush_interval_ms: u64,
    logs_per_flush: usize,
    max_retry_count: u32,
    exponential_backoff_base_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    purgeable_age_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_flush_size_in_bytes: Option<u64>,
}

impl From<&BufferedOutputConfig> for BufferInfo {
    fn from(config: &BufferedOutputConfig) -> Self {
        Self {
            flush_interval_ms: config.flush_interval.as_millis() as u64,
            logs_per_flush: config.logs_per_flush,
            max_retry_count: config.max_retry_count,
            exponential_backoff_base_ms: config.exponential_backoff_base.as_millis() as u64,
            purgeable_age_ms: config.purgeable_age.map(|age| age.as_millis() as u64),
            max_flush_size_in_bytes: config.max_flush_size_in_bytes,
        }
    }
}

#[derive(Serialize)]
struct FilterInfo {
    filter_type: String,
    kinds: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &ShipperBlueprint, args: &InfoArgs) -> ConfigInfo {
    let outputs = blueprint
        .outputs
        .iter()
        .map(|o| OutputInfo {
            name: o.name.clone(),
            sink_type: format!("{:?}", o.sink_type),
            buffered: o.is_buffered(),
            kinds: o.kinds.clone(),
            buffer: (args.buffers && o.is_buffered())
                .then(|| BufferInfo::from(&o.buffered_output_config())),
        })
        .collect();

    let filters = if args.filters {
        blueprint
            .filters
            .iter()
            .map(|f| FilterInfo {
                filter_type: format!("{:?}", f.filter_type),
                kinds: f.kinds.clone(),
                params: f.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        store: blueprint.store.clone(),
        kinds: blueprint.kinds().into_iter().map(str::to_string).collect(),
        outputs,
        filters,
    }
}

fn print_config_info(blueprint: &ShipperBlueprint, args: &InfoArgs) {
    println!("=== logship configuration ===\n");

    println!("Store");
    println!("   ├─ Version: {:?}", blueprint.version);
    match &blueprint.store {
        StoreConfig::Memory => println!("   └─ Memory (lost on exit)"),
        StoreConfig::File { path, sync_writes } => {
            println!("   └─ File: {} (sync_writes: {})", path.display(), sync_writes)
        }
    }

    let kinds = blueprint.kinds();
    println!("\nKinds ({})", kinds.len());
    for (i, kind) in kinds.iter().enumerate() {
        let prefix = if i == kinds.len() - 1 { "└─" } else { "├─" };
        let filters = blueprint
            .filters
            .iter()
            .filter(|f| f.kinds.iter().any(|k| k == kind))
            .count();
        let outputs: Vec<&str> = blueprint
            .outputs
            .iter()
            .filter(|o| o.kinds.iter().any(|k| k == kind))
            .map(|o| o.name.as_str())
            .collect();
        println!(
            "   {} {}: {} filters -> [{}]",
            prefix,
            kind,
            filters,
            outputs.join(", ")
        );
    }

    if args.filters && !blueprint.filters.is_empty() {
        println!("\nFilters ({}), in chain order", blueprint.filters.len());
        for (i, filter) in blueprint.filters.iter().enumerate() {
            let prefix = if i == blueprint.filters.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {:?} on {:?} {:?}",
                prefix, filter.filter_type, filter.kinds, filter.params
            );
        }
    }

    println!("\nOutputs ({})", blueprint.outputs.len());
    for (i, output) in blueprint.outputs.iter().enumerate() {
        let is_last = i == blueprint.outputs.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let mode = if output.is_buffered() { "buffered" } else { "immediate" };

        println!("   {} {} ({:?}, {})", prefix, output.name, output.sink_type, mode);

        if args.buffers && output.is_buffered() {
            let buffer = BufferInfo::from(&output.buffered_output_config());
            println!(
                "   {}  └─ every {} ms, {} logs/flush, {} retries from {} ms",
                child_prefix,
                buffer.flush_interval_ms,
                buffer.logs_per_flush,
                buffer.max_retry_count,
                buffer.exponential_backoff_base_ms
            );
        }
    }

    println!();
}
