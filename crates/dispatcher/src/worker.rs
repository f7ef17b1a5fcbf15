//! Router worker - the single task that owns all mutable state
//!
//! Every post, lifecycle transition, timer tick and sink completion is
//! handled here, one at a time, so schedules and store partitions never need
//! locking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{
    Clock, ContractError, FlushCompletion, LifecycleSignal, LogEvent, LogKind, LogSerializer,
    LogStore,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, trace};

use crate::buffered::{FlushPlan, OutputState};
use crate::lifecycle::{transition, LifecycleAction, LifecycleSignals, RunState};
use crate::registry::{Route, Target};

/// Requests from [`crate::Router`] handles
pub(crate) enum Command<E> {
    Post(E),
    Suspend,
    Resume,
    FlushAll,
    Shutdown(oneshot::Sender<()>),
}

/// Outcome of one flush attempt, sent back by a [`FlushCompletion`]
pub(crate) struct FlushFinished {
    output: usize,
    attempt: u64,
    outcome: Result<(), ContractError>,
}

pub(crate) struct Worker<E> {
    pub(crate) serializer: Box<dyn LogSerializer<E>>,
    pub(crate) store: Box<dyn LogStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) routes: HashMap<LogKind, Route>,
    pub(crate) outputs: Vec<OutputState>,
    pub(crate) state: RunState,
    pub(crate) lifecycle: Option<LifecycleSignals>,
    pub(crate) commands: mpsc::UnboundedReceiver<Command<E>>,
    pub(crate) completions_tx: mpsc::UnboundedSender<FlushFinished>,
    pub(crate) completions_rx: mpsc::UnboundedReceiver<FlushFinished>,
}

impl<E: LogEvent> Worker<E> {
    /// Run until shutdown or until every router handle is dropped
    #[instrument(name = "router_worker_loop", skip(self), fields(outputs = self.outputs.len()))]
    pub(crate) async fn run(mut self) {
        debug!(state = ?self.state, "Router worker started");
        let mut shutdown_ack = None;

        loop {
            let timer = self.next_timer_delay();

            tokio::select! {
                biased;

                Some(finished) = self.completions_rx.recv() => {
                    self.on_flush_finished(finished);
                }

                // a due flush goes ahead of queued commands
                _ = tokio::time::sleep(timer.unwrap_or_default()), if timer.is_some() => {
                    self.flush_due();
                }

                command = self.commands.recv() => match command {
                    Some(Command::Post(event)) => self.dispatch(event),
                    Some(Command::Suspend) => self.on_signal(LifecycleSignal::Inactive),
                    Some(Command::Resume) => self.on_signal(LifecycleSignal::Active),
                    Some(Command::FlushAll) => self.flush_all(),
                    Some(Command::Shutdown(ack)) => {
                        shutdown_ack = Some(ack);
                        break;
                    }
                    None => break,
                },

                signal = next_signal(&mut self.lifecycle) => match signal {
                    Some(signal) => self.on_signal(signal),
                    None => {
                        debug!("Lifecycle source dropped, keeping current state");
                        self.lifecycle = None;
                    }
                },
            }
        }

        info!("Router worker stopped");
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    /// Serialize, filter and fan out one event
    #[instrument(name = "router_dispatch", skip(self, event), fields(kind = %event.kind()))]
    fn dispatch(&mut self, event: E) {
        let kind = event.kind();
        let Some(route) = self.routes.get(&kind) else {
            // the handle checks registration before sending
            error!(kind = %kind, "Dispatch for unregistered kind");
            return;
        };

        let log = match self.serializer.serialize(&event) {
            Ok(log) => log,
            Err(e) => {
                error!(kind = %kind, error = %e, "Failed to serialize log");
                return;
            }
        };

        let Some(log) = route.apply_filters(log) else {
            observability::record_log_skipped(kind.as_str());
            trace!(kind = %kind, "Log skipped by filter");
            return;
        };

        let now = self.clock.now();
        for target in &route.targets {
            match target {
                Target::Immediate(sink) => sink.emit(&log),
                Target::Buffered(idx) => {
                    self.outputs[*idx].enqueue(self.store.as_mut(), log.clone(), now)
                }
            }
        }
    }

    fn on_signal(&mut self, signal: LifecycleSignal) {
        let (state, action) = transition(self.state, signal);
        self.state = state;
        match action {
            Some(LifecycleAction::Suspend) => info!("Buffered outputs suspended"),
            // the next loop iteration re-arms the timer from each next_flush_at
            Some(LifecycleAction::Resume) => info!("Buffered outputs resumed"),
            None => trace!(?signal, "Duplicate lifecycle signal ignored"),
        }
    }

    /// Time until the earliest idle output is due; `None` while suspended
    fn next_timer_delay(&self) -> Option<Duration> {
        if self.state == RunState::Suspended {
            return None;
        }
        let next = self
            .outputs
            .iter()
            .filter(|output| output.is_idle())
            .map(|output| output.schedule().next_flush_at)
            .min()?;
        Some((next - self.clock.now()).to_std().unwrap_or(Duration::ZERO))
    }

    fn flush_due(&mut self) {
        let now = self.clock.now();
        for idx in 0..self.outputs.len() {
            let output = &self.outputs[idx];
            if output.is_idle() && output.schedule().is_due(now) {
                self.flush(idx, now);
            }
        }
    }

    #[instrument(name = "router_flush_all", skip(self))]
    fn flush_all(&mut self) {
        let now = self.clock.now();
        for idx in 0..self.outputs.len() {
            self.flush(idx, now);
        }
    }

    fn flush(&mut self, idx: usize, now: DateTime<Utc>) {
        let output = &mut self.outputs[idx];
        match output.begin_flush(self.store.as_mut(), now) {
            FlushPlan::Emit { attempt, logs } => {
                debug!(output = %output.id(), attempt, logs = logs.len(), "Flushing batch");
                let completions = self.completions_tx.clone();
                let completion = FlushCompletion::new(output.sink().name(), move |outcome| {
                    // the worker may already be gone after shutdown
                    let _ = completions.send(FlushFinished {
                        output: idx,
                        attempt,
                        outcome,
                    });
                });
                output.sink().emit(logs, completion);
            }
            FlushPlan::InFlight => {
                debug!(output = %output.id(), "Flush already in flight, skipped");
            }
            FlushPlan::Empty | FlushPlan::Aborted => {}
        }
    }

    fn on_flush_finished(&mut self, finished: FlushFinished) {
        let now = self.clock.now();
        let Some(output) = self.outputs.get_mut(finished.output) else {
            return;
        };
        output.finish_flush(self.store.as_mut(), finished.attempt, finished.outcome, now);
    }
}

async fn next_signal(signals: &mut Option<LifecycleSignals>) -> Option<LifecycleSignal> {
    match signals {
        Some(signals) => signals.changed().await,
        None => std::future::pending().await,
    }
}
