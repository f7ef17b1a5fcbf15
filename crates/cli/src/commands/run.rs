//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{build_router, KindTable, Shipper};
use config_loader::ShipperBlueprint;

/// Execute the `run` command
pub async fn run_shipper(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        store = ?blueprint.store,
        filters = blueprint.filters.len(),
        outputs = blueprint.outputs.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)
            .context("Failed to start metrics exporter")?;
        info!(port = args.metrics_port, "Metrics exporter listening");
    }

    let kinds = KindTable::from_blueprint(&blueprint);
    let router = build_router(&blueprint, &kinds)
        .await
        .context("Failed to build router")?;
    info!(kinds = kinds.len(), "Router started");

    let mut shipper = Shipper::new(router, kinds, args.kind_field.clone());
    let reader = open_input(args).await?;

    let stats = shipper
        .ship(reader, shutdown_signal())
        .await
        .context("Reading input failed")?
        .clone();

    info!(
        lines = stats.lines,
        posted = stats.posted,
        invalid = stats.invalid,
        "Input finished, flushing buffered outputs"
    );

    let router = shipper.router().clone();
    router.flush_all()?;
    tokio::time::sleep(Duration::from_millis(args.drain_ms)).await;
    router.shutdown().await?;

    stats.print_summary(&router.metrics());
    info!("logship finished");
    Ok(())
}

async fn open_input(args: &RunArgs) -> Result<Box<dyn AsyncBufRead + Unpin>> {
    Ok(match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    })
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that fails to install never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &ShipperBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Store: {:?}", blueprint.store);
    println!("Kinds: {}", blueprint.kinds().join(", "));

    if !blueprint.filters.is_empty() {
        println!("\nFilters ({}):", blueprint.filters.len());
        for filter in &blueprint.filters {
            println!("  - {:?} on {:?}", filter.filter_type, filter.kinds);
        }
    }

    println!("\nOutputs ({}):", blueprint.outputs.len());
    for output in &blueprint.outputs {
        let mode = if output.is_buffered() { "buffered" } else { "immediate" };
        println!(
            "  - {} ({:?}, {}) <- {:?}",
            output.name, output.sink_type, mode, output.kinds
        );
    }

    println!();
}
