//! Router construction from a blueprint, and the line-shipping loop.

use std::future::Future;

use config_loader::ShipperBlueprint;
use contracts::{FilterConfig, FilterType, LogStore, OutputConfig, SinkType, StoreConfig};
use dispatcher::{
    AddTimeFilter, BufferedOutput, DispatcherError, FileSink, KeepIfFilter, LogSink, NetworkSink,
    Output, RemoveKeysFilter, Router, RouterBuilder, SpawnedSink,
};
use log_store::{FileLogStore, MemoryLogStore};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, instrument, warn};

use super::input::{parse_line, KindTable, ParsedLine, RawEvent, RawSerializer};
use super::stats::ShipStats;
use crate::error::Result;

/// Build and start a router for `blueprint`
#[instrument(name = "build_router", skip_all, fields(outputs = blueprint.outputs.len()))]
pub async fn build_router(
    blueprint: &ShipperBlueprint,
    kinds: &KindTable,
) -> Result<Router<RawEvent>> {
    let store = open_store(&blueprint.store)?;
    let mut builder = Router::builder(RawSerializer, store);

    for filter in &blueprint.filters {
        builder = add_filter(builder, filter, &kinds.resolve(&filter.kinds));
    }

    for output in &blueprint.outputs {
        let bound = kinds.resolve(&output.kinds);
        builder = builder.output(build_output(output).await?, &bound);
        info!(
            output = %output.name,
            sink_type = ?output.sink_type,
            buffered = output.is_buffered(),
            kinds = ?output.kinds,
            "Output registered"
        );
    }

    Ok(builder.build()?)
}

fn open_store(config: &StoreConfig) -> Result<Box<dyn LogStore>> {
    Ok(match config {
        StoreConfig::Memory => Box::new(MemoryLogStore::new()),
        StoreConfig::File { path, sync_writes } => {
            let store = FileLogStore::open(path)?;
            info!(path = %path.display(), sync_writes, "File store opened");
            if *sync_writes {
                Box::new(store)
            } else {
                Box::new(store.without_sync())
            }
        }
    })
}

fn add_filter(
    builder: RouterBuilder<RawEvent>,
    filter: &FilterConfig,
    kinds: &[contracts::LogKind],
) -> RouterBuilder<RawEvent> {
    let param = |key: &str| filter.params.get(key).map(String::as_str);

    match filter.filter_type {
        FilterType::AddTime => {
            let key = param("key").unwrap_or("time");
            builder.filter(AddTimeFilter::new().key(key), kinds)
        }
        FilterType::RemoveKeys => {
            let keys = param("keys")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty());
            builder.filter(RemoveKeysFilter::new(keys), kinds)
        }
        FilterType::KeepIf => {
            let key = param("key").unwrap_or_default();
            let raw = param("value").unwrap_or_default();
            // `value` is matched as JSON when it parses, as a string otherwise
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
            builder.filter(KeepIfFilter::new(key, value), kinds)
        }
    }
}

async fn build_output(config: &OutputConfig) -> Result<Output> {
    let name = config.name.as_str();
    let output = match config.sink_type {
        SinkType::Log if !config.is_buffered() => Output::immediate(LogSink::new(name)),
        SinkType::Log => BufferedOutput::new(name, LogSink::new(name)).into(),
        SinkType::File => {
            let sink = FileSink::from_params(name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(name, e.to_string()))?;
            BufferedOutput::new(name, sink).into()
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(name, e.to_string()))?;
            BufferedOutput::new(name, SpawnedSink::new(sink)).into()
        }
    };

    Ok(match output {
        Output::Buffered(buffered) => {
            Output::Buffered(buffered.with_config(config.buffered_output_config()))
        }
        immediate => immediate,
    })
}

/// Feeds input lines into a router
pub struct Shipper {
    router: Router<RawEvent>,
    kinds: KindTable,
    kind_field: String,
    stats: ShipStats,
}

impl Shipper {
    pub fn new(router: Router<RawEvent>, kinds: KindTable, kind_field: impl Into<String>) -> Self {
        Self {
            router,
            kinds,
            kind_field: kind_field.into(),
            stats: ShipStats::default(),
        }
    }

    pub fn router(&self) -> &Router<RawEvent> {
        &self.router
    }

    /// Ship lines until EOF or until `shutdown` resolves
    pub async fn ship<R, F>(&mut self, reader: R, shutdown: F) -> anyhow::Result<&ShipStats>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        let mut lines = reader.lines();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping input");
                    break;
                }
                line = lines.next_line() => match line? {
                    Some(line) => self.ship_line(&line),
                    None => {
                        debug!("Input exhausted");
                        break;
                    }
                },
            }
        }

        Ok(&self.stats)
    }

    fn ship_line(&mut self, line: &str) {
        self.stats.lines += 1;
        let line_no = self.stats.lines;

        match parse_line(line_no, line, &self.kind_field, &self.kinds) {
            Ok(ParsedLine::Blank) => self.stats.blank += 1,
            Ok(ParsedLine::Event(event)) => match self.router.post(event) {
                Ok(()) => self.stats.posted += 1,
                Err(e) => {
                    self.stats.rejected += 1;
                    warn!(line = line_no, error = %e, "Log rejected by router");
                }
            },
            Ok(ParsedLine::UnknownKind(kind)) => {
                self.stats.rejected += 1;
                warn!(line = line_no, kind = %kind, "Log kind is not configured");
            }
            Err(e) => {
                self.stats.invalid += 1;
                warn!(error = %e, "Invalid input line");
            }
        }
    }
}
