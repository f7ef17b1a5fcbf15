//! LogSink - logs documents via tracing

use contracts::{BufferedSink, Document, FlushCompletion, ImmediateSink};
use tracing::{info, instrument};

/// Sink that prints logs through `tracing`, usable immediate or buffered
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_document(&self, log: &Document) {
        let rendered = serde_json::to_string(log).unwrap_or_default();
        info!(sink = %self.name, log = %rendered, "Log emitted");
    }
}

impl ImmediateSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_emit", skip(self, log), fields(sink = %self.name))]
    fn emit(&self, log: &Document) {
        self.log_document(log);
    }
}

impl BufferedSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_emit_batch",
        skip(self, logs, completion),
        fields(sink = %self.name, logs = logs.len())
    )]
    fn emit(&self, logs: Vec<Document>, completion: FlushCompletion) {
        for log in &logs {
            self.log_document(log);
        }
        completion.succeed();
    }
}
