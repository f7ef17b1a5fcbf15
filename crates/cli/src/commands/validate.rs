//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SinkType, StoreConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use config_loader::ShipperBlueprint;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    store: String,
    kind_count: usize,
    filter_count: usize,
    output_count: usize,
    buffered_output_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    store: match &blueprint.store {
                        StoreConfig::Memory => "memory".to_string(),
                        StoreConfig::File { path, .. } => format!("file ({})", path.display()),
                    },
                    kind_count: blueprint.kinds().len(),
                    filter_count: blueprint.filters.len(),
                    output_count: blueprint.outputs.len(),
                    buffered_output_count: blueprint
                        .outputs
                        .iter()
                        .filter(|o| o.is_buffered())
                        .count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &ShipperBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    // Kinds that only appear in filters are accepted but never delivered
    for filter in &blueprint.filters {
        for kind in &filter.kinds {
            if !blueprint.outputs.iter().any(|o| o.kinds.contains(kind)) {
                warnings.push(format!(
                    "Kind '{}' has filters but no outputs - its logs will be dropped",
                    kind
                ));
            }
        }
    }

    let buffered = blueprint.outputs.iter().filter(|o| o.is_buffered());
    for output in buffered {
        let settings = output.buffer.clone().unwrap_or_default();

        if output.sink_type == SinkType::Network && settings.max_flush_size_in_bytes.is_none() {
            warnings.push(format!(
                "Network output '{}' has no buffer.max_flush_size_in_bytes - large batches may exceed the packet size",
                output.name
            ));
        }

        if settings.purgeable_age_ms.is_none() && matches!(blueprint.store, StoreConfig::File { .. }) {
            warnings.push(format!(
                "Output '{}' has no buffer.purgeable_age_ms - undeliverable logs accumulate on disk",
                output.name
            ));
        }

        if settings.exponential_backoff_base_ms < 0 {
            warnings.push(format!(
                "Output '{}' has a negative backoff base, its absolute value is used",
                output.name
            ));
        }
    }

    if matches!(blueprint.store, StoreConfig::Memory)
        && blueprint.outputs.iter().any(|o| o.is_buffered())
    {
        warnings.push("Memory store - buffered logs are lost on exit".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Store: {}", summary.store);
            println!("  Kinds: {}", summary.kind_count);
            println!("  Filters: {}", summary.filter_count);
            println!(
                "  Outputs: {} ({} buffered)",
                summary.output_count, summary.buffered_output_count
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
