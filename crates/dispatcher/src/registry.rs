//! Kind registry - per-kind filter chains and output bindings

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{Document, FilterOutcome, ImmediateSink, LogFilter, LogKind};

use crate::buffered::BufferedOutput;
use crate::error::DispatcherError;

/// Where a kind's documents go
#[derive(Clone)]
pub enum Output {
    /// Receives each document as it is dispatched
    Immediate(Arc<dyn ImmediateSink>),
    /// Buffers documents in the store and ships them in batches
    Buffered(BufferedOutput),
}

impl Output {
    /// Wrap an immediate sink
    pub fn immediate(sink: impl ImmediateSink + 'static) -> Self {
        Self::Immediate(Arc::new(sink))
    }

    /// Wrap a buffered output
    pub fn buffered(output: BufferedOutput) -> Self {
        Self::Buffered(output)
    }
}

impl From<BufferedOutput> for Output {
    fn from(output: BufferedOutput) -> Self {
        Self::Buffered(output)
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Immediate(sink) => f.debug_tuple("Immediate").field(&sink.name()).finish(),
            Output::Buffered(output) => f.debug_tuple("Buffered").field(output).finish(),
        }
    }
}

/// Filters and outputs registered for one kind, before the router is built
#[derive(Default)]
pub(crate) struct KindChain {
    pub(crate) filters: Vec<Arc<dyn LogFilter>>,
    pub(crate) outputs: Vec<Output>,
}

/// A resolved output binding
pub(crate) enum Target {
    Immediate(Arc<dyn ImmediateSink>),
    /// Index into the worker's buffered outputs
    Buffered(usize),
}

/// Filters and targets of one kind, immutable once built
pub(crate) struct Route {
    pub(crate) filters: Vec<Arc<dyn LogFilter>>,
    pub(crate) targets: Vec<Target>,
}

impl Route {
    /// Fold the filter chain left to right; `None` if a filter skipped
    pub(crate) fn apply_filters(&self, log: Document) -> Option<Document> {
        self.filters
            .iter()
            .try_fold(log, |log, filter| match filter.apply(log) {
                FilterOutcome::Keep(log) => Some(log),
                FilterOutcome::Skip => None,
            })
    }
}

/// Resolve kind chains into routes and a deduplicated, ordered list of
/// buffered outputs
///
/// Outputs sharing an id must be the same instance.
pub(crate) fn resolve(
    chains: Vec<(LogKind, KindChain)>,
) -> Result<(HashMap<LogKind, Route>, Vec<BufferedOutput>), DispatcherError> {
    let mut routes = HashMap::with_capacity(chains.len());
    let mut buffered: Vec<BufferedOutput> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (kind, chain) in chains {
        let mut targets = Vec::with_capacity(chain.outputs.len());
        for output in chain.outputs {
            match output {
                Output::Immediate(sink) => targets.push(Target::Immediate(sink)),
                Output::Buffered(output) => {
                    let idx = match index.get(output.id()) {
                        Some(&idx) if buffered[idx].is_same_instance(&output) => idx,
                        Some(_) => return Err(DispatcherError::duplicate_output_id(output.id())),
                        None => {
                            index.insert(output.id().to_string(), buffered.len());
                            buffered.push(output);
                            buffered.len() - 1
                        }
                    };
                    targets.push(Target::Buffered(idx));
                }
            }
        }
        routes.insert(
            kind,
            Route {
                filters: chain.filters,
                targets,
            },
        );
    }

    Ok((routes, buffered))
}
