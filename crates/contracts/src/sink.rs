//! Sink traits - router output interfaces
//!
//! Immediate sinks receive each document as it is dispatched. Buffered sinks
//! receive batches assembled from the store and must report the outcome
//! through a [`FlushCompletion`].

use crate::{ContractError, Document};

/// Per-event output
pub trait ImmediateSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Emit one document
    ///
    /// Fire-and-forget: failures are the sink's own concern.
    fn emit(&self, log: &Document);
}

/// Per-batch output driven by a buffered output's schedule
pub trait BufferedSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Emit a batch, oldest entry first
    ///
    /// The outcome is reported by consuming `completion`, either inside this
    /// call or later from another task.
    fn emit(&self, logs: Vec<Document>, completion: FlushCompletion);
}

/// Async batch output
///
/// Adapted to [`BufferedSink`] by spawning the send on the runtime.
#[trait_variant::make(BatchSink: Send)]
pub trait LocalBatchSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Send a batch
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn emit_batch(&self, logs: &[Document]) -> Result<(), ContractError>;
}

type Reporter = Box<dyn FnOnce(Result<(), ContractError>) + Send>;

/// Single-shot completion handle for one flush attempt
///
/// Exactly one outcome reaches the owner: `succeed` and `fail` consume the
/// handle, and dropping it unreported counts as a failure.
pub struct FlushCompletion {
    sink_name: String,
    reporter: Option<Reporter>,
}

impl FlushCompletion {
    /// Create a completion that forwards the outcome to `reporter`
    pub fn new(
        sink_name: impl Into<String>,
        reporter: impl FnOnce(Result<(), ContractError>) + Send + 'static,
    ) -> Self {
        Self {
            sink_name: sink_name.into(),
            reporter: Some(Box::new(reporter)),
        }
    }

    /// Report that the batch was delivered
    pub fn succeed(mut self) {
        self.report(Ok(()));
    }

    /// Report that the batch was not delivered
    pub fn fail(mut self, error: ContractError) {
        self.report(Err(error));
    }

    /// Report an outcome computed elsewhere
    pub fn complete(mut self, outcome: Result<(), ContractError>) {
        self.report(outcome);
    }

    fn report(&mut self, outcome: Result<(), ContractError>) {
        if let Some(reporter) = self.reporter.take() {
            reporter(outcome);
        }
    }
}

impl Drop for FlushCompletion {
    fn drop(&mut self) {
        let sink_name = std::mem::take(&mut self.sink_name);
        self.report(Err(ContractError::CompletionAbandoned { sink_name }));
    }
}

impl std::fmt::Debug for FlushCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushCompletion")
            .field("sink_name", &self.sink_name)
            .field("pending", &self.reporter.is_some())
            .finish()
    }
}
