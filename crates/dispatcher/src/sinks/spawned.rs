//! SpawnedSink - runs an async [`BatchSink`] as a [`BufferedSink`]

use std::sync::Arc;

use contracts::{BatchSink, BufferedSink, ContractError, Document, FlushCompletion};
use tokio::runtime::Handle;
use tracing::{debug, error, instrument};

/// Adapter that spawns each batch send onto the tokio runtime
///
/// The router worker is never blocked by the send; the outcome travels back
/// through the batch's [`FlushCompletion`].
pub struct SpawnedSink<S> {
    name: String,
    inner: Arc<S>,
    runtime: Option<Handle>,
}

impl<S> SpawnedSink<S>
where
    S: BatchSink + Sync + 'static,
{
    /// Wrap `sink`, spawning onto the current runtime when emitting
    pub fn new(sink: S) -> Self {
        Self {
            name: sink.name().to_string(),
            inner: Arc::new(sink),
            runtime: None,
        }
    }

    /// Spawn onto a specific runtime
    pub fn on_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Wrapped sink
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }
}

impl<S> BufferedSink for SpawnedSink<S>
where
    S: BatchSink + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "spawned_sink_emit",
        skip(self, logs, completion),
        fields(sink = %self.name, logs = logs.len())
    )]
    fn emit(&self, logs: Vec<Document>, completion: FlushCompletion) {
        let runtime = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => {
                error!(sink = %self.name, "No tokio runtime to run the batch on");
                completion.fail(ContractError::sink_write(&self.name, "no tokio runtime"));
                return;
            }
        };

        let sink = Arc::clone(&self.inner);
        let name = self.name.clone();
        runtime.spawn(async move {
            let outcome = sink.emit_batch(&logs).await;
            if let Err(e) = &outcome {
                error!(sink = %name, error = %e, "Batch send failed");
            } else {
                debug!(sink = %name, logs = logs.len(), "Batch sent");
            }
            completion.complete(outcome);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::oneshot;

    /// Mock sink for testing
    struct MockSink {
        sent: AtomicU64,
        should_fail: bool,
    }

    impl BatchSink for MockSink {
        fn name(&self) -> &str {
            "mock"
        }

        async fn emit_batch(&self, logs: &[Document]) -> Result<(), ContractError> {
            tokio::task::yield_now().await;
            if self.should_fail {
                return Err(ContractError::sink_write("mock", "mock failure"));
            }
            self.sent.fetch_add(logs.len() as u64, Ordering::Relaxed);
            Ok(())
        }
    }

    async fn emit(sink: &SpawnedSink<MockSink>, logs: Vec<Document>) -> Result<(), ContractError> {
        let (tx, rx) = oneshot::channel();
        let completion = FlushCompletion::new("mock", move |outcome| {
            let _ = tx.send(outcome);
        });
        sink.emit(logs, completion);
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_spawned_sink_reports_success() {
        let sink = SpawnedSink::new(MockSink {
            sent: AtomicU64::new(0),
            should_fail: false,
        });

        emit(&sink, vec![Document::new(), Document::new()])
            .await
            .unwrap();
        assert_eq!(sink.inner().sent.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_spawned_sink_reports_failure() {
        let sink = SpawnedSink::new(MockSink {
            sent: AtomicU64::new(0),
            should_fail: true,
        });

        let result = emit(&sink, vec![Document::new()]).await;
        assert!(matches!(result, Err(ContractError::SinkWrite { .. })));
    }

    #[test]
    fn test_spawned_sink_without_runtime_fails_batch() {
        let sink = SpawnedSink::new(MockSink {
            sent: AtomicU64::new(0),
            should_fail: false,
        });
        let (tx, rx) = std::sync::mpsc::channel();
        let completion = FlushCompletion::new("mock", move |outcome| {
            tx.send(outcome).unwrap();
        });

        sink.emit(vec![Document::new()], completion);
        assert!(rx.recv().unwrap().is_err());
    }
}
