//! Router - build-time registry and the runtime handle
//!
//! [`RouterBuilder`] collects per-kind filter chains and outputs; `build()`
//! moves them into the worker task and hands back a cloneable [`Router`].

use std::collections::HashSet;
use std::sync::Arc;

use contracts::{Clock, LogEvent, LogFilter, LogKind, LogSerializer, LogStore, SystemClock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, instrument};

use crate::buffered::OutputState;
use crate::error::DispatcherError;
use crate::lifecycle::{LifecycleSignals, RunState};
use crate::metrics::{MetricsSnapshot, OutputMetrics};
use crate::registry::{self, KindChain, Output};
use crate::worker::{Command, Worker};

/// Collects the registry before the router starts
pub struct RouterBuilder<E> {
    serializer: Box<dyn LogSerializer<E>>,
    store: Box<dyn LogStore>,
    clock: Arc<dyn Clock>,
    lifecycle: Option<LifecycleSignals>,
    chains: Vec<(LogKind, KindChain)>,
}

impl<E: LogEvent> RouterBuilder<E> {
    /// Start a builder with the wall clock and no lifecycle source
    pub fn new(serializer: impl LogSerializer<E>, store: impl LogStore + 'static) -> Self {
        Self {
            serializer: Box::new(serializer),
            store: Box::new(store),
            clock: Arc::new(SystemClock),
            lifecycle: None,
            chains: Vec::new(),
        }
    }

    /// Use a different time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Drive suspend/resume from a lifecycle source
    ///
    /// The router starts in the state matching the source's current signal.
    pub fn lifecycle(mut self, signals: LifecycleSignals) -> Self {
        self.lifecycle = Some(signals);
        self
    }

    /// Append `filter` to the chain of every listed kind
    pub fn filter(mut self, filter: impl LogFilter + 'static, kinds: &[LogKind]) -> Self {
        let filter: Arc<dyn LogFilter> = Arc::new(filter);
        for &kind in kinds {
            self.chain(kind).filters.push(Arc::clone(&filter));
        }
        self
    }

    /// Bind `output` to every listed kind
    pub fn output(mut self, output: impl Into<Output>, kinds: &[LogKind]) -> Self {
        let output = output.into();
        for &kind in kinds {
            self.chain(kind).outputs.push(output.clone());
        }
        self
    }

    /// Register `kind` with its filters and outputs in one call
    pub fn log_type(
        mut self,
        kind: LogKind,
        filters: Vec<Arc<dyn LogFilter>>,
        outputs: Vec<Output>,
    ) -> Self {
        let chain = self.chain(kind);
        chain.filters.extend(filters);
        chain.outputs.extend(outputs);
        self
    }

    fn chain(&mut self, kind: LogKind) -> &mut KindChain {
        let pos = match self.chains.iter().position(|(k, _)| *k == kind) {
            Some(pos) => pos,
            None => {
                self.chains.push((kind, KindChain::default()));
                self.chains.len() - 1
            }
        };
        &mut self.chains[pos].1
    }

    /// Freeze the registry and start the worker on the current runtime
    ///
    /// # Errors
    /// - [`DispatcherError::DuplicateOutputId`] if two different buffered
    ///   outputs share an id
    /// - [`DispatcherError::NoRuntime`] outside a tokio runtime
    #[instrument(name = "router_build", skip(self), fields(kinds = self.chains.len()))]
    pub fn build(self) -> Result<Router<E>, DispatcherError> {
        let runtime = Handle::try_current().map_err(|_| DispatcherError::NoRuntime)?;

        let kinds: HashSet<LogKind> = self.chains.iter().map(|(kind, _)| *kind).collect();
        let (routes, buffered) = registry::resolve(self.chains)?;

        let now = self.clock.now();
        let outputs: Vec<OutputState> = buffered
            .into_iter()
            .map(|output| OutputState::new(output, now))
            .collect();
        let metrics = outputs
            .iter()
            .map(|output| (output.id().to_string(), Arc::clone(output.metrics())))
            .collect();

        let mut lifecycle = self.lifecycle;
        let state = match lifecycle.as_mut().map(|signals| signals.current()) {
            Some(contracts::LifecycleSignal::Inactive) => RunState::Suspended,
            Some(contracts::LifecycleSignal::Active) | None => RunState::Resumed,
        };

        info!(
            kinds = kinds.len(),
            buffered_outputs = outputs.len(),
            ?state,
            "Router built"
        );

        let (tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            serializer: self.serializer,
            store: self.store,
            clock: self.clock,
            routes,
            outputs,
            state,
            lifecycle,
            commands,
            completions_tx,
            completions_rx,
        };
        runtime.spawn(worker.run());

        Ok(Router {
            kinds: Arc::new(kinds),
            tx,
            metrics: Arc::new(metrics),
        })
    }
}

/// Handle to a running router
///
/// Cheap to clone. The worker stops once [`Router::shutdown`] is called or
/// every handle is dropped; buffered entries stay in the store.
pub struct Router<E> {
    kinds: Arc<HashSet<LogKind>>,
    tx: mpsc::UnboundedSender<Command<E>>,
    metrics: Arc<Vec<(String, Arc<OutputMetrics>)>>,
}

impl<E> Clone for Router<E> {
    fn clone(&self) -> Self {
        Self {
            kinds: Arc::clone(&self.kinds),
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<E: LogEvent> Router<E> {
    /// Start building a router
    pub fn builder(
        serializer: impl LogSerializer<E>,
        store: impl LogStore + 'static,
    ) -> RouterBuilder<E> {
        RouterBuilder::new(serializer, store)
    }

    /// Queue an event for dispatch
    ///
    /// Returns once the event is queued; serialization, filtering and fan-out
    /// happen on the worker in post order.
    ///
    /// # Errors
    /// - [`DispatcherError::UnregisteredKind`] if the kind has no chain
    /// - [`DispatcherError::WorkerClosed`] after shutdown
    pub fn post(&self, event: E) -> Result<(), DispatcherError> {
        let kind = event.kind();
        if !self.kinds.contains(&kind) {
            return Err(DispatcherError::unregistered_kind(kind.as_str()));
        }
        observability::record_log_posted(kind.as_str());
        self.send(Command::Post(event))
    }

    /// Stop timer-driven flushes; in-flight flushes still complete
    pub fn suspend(&self) -> Result<(), DispatcherError> {
        self.send(Command::Suspend)
    }

    /// Re-arm every output from its own `next_flush_at`
    pub fn resume(&self) -> Result<(), DispatcherError> {
        self.send(Command::Resume)
    }

    /// Flush every buffered output now, in registration order
    ///
    /// Works while suspended.
    pub fn flush_all(&self) -> Result<(), DispatcherError> {
        self.send(Command::FlushAll)
    }

    /// Whether `kind` was registered
    pub fn is_registered(&self, kind: LogKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Counters of every buffered output, in registration order
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.metrics
            .iter()
            .map(|(id, metrics)| (id.clone(), metrics.snapshot()))
            .collect()
    }

    /// Counters of one buffered output
    pub fn output_metrics(&self, id: &str) -> Option<MetricsSnapshot> {
        self.metrics
            .iter()
            .find(|(output_id, _)| output_id == id)
            .map(|(_, metrics)| metrics.snapshot())
    }

    /// Stop the worker after the commands queued before this call
    ///
    /// Completions of flushes still in flight are discarded; their entries
    /// stay buffered.
    #[instrument(name = "router_shutdown", skip(self))]
    pub async fn shutdown(&self) -> Result<(), DispatcherError> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Shutdown(ack))?;
        done.await.map_err(|_| DispatcherError::WorkerClosed)
    }

    fn send(&self, command: Command<E>) -> Result<(), DispatcherError> {
        self.tx
            .send(command)
            .map_err(|_| DispatcherError::WorkerClosed)
    }
}
