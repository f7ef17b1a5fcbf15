//! FileSink - appends batches to a JSON-lines file

use contracts::{BufferedSink, ContractError, Document, FlushCompletion};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// Buffered sink writing one JSON object per line to `<base_path>/<name>.jsonl`
pub struct FileSink {
    name: String,
    path: PathBuf,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        let name = name.into();
        let path = config.base_path.join(format!("{}.jsonl", name));
        Ok(Self { name, path })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    /// Output file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn write_batch(&self, logs: &[Document]) -> std::io::Result<()> {
        let mut buf = Vec::new();
        for log in logs {
            serde_json::to_writer(&mut buf, log)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            buf.push(b'\n');
        }

        // one write per batch
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&buf)?;
        file.sync_data()
    }

    fn persist_batch(&self, logs: &[Document]) -> Result<(), ContractError> {
        self.write_batch(logs).map_err(|e| {
            error!(sink = %self.name, logs = logs.len(), error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl BufferedSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_emit",
        skip(self, logs, completion),
        fields(sink = %self.name, logs = logs.len())
    )]
    fn emit(&self, logs: Vec<Document>, completion: FlushCompletion) {
        let outcome = self.persist_batch(&logs);
        if outcome.is_ok() {
            debug!(sink = %self.name, path = %self.path.display(), "Batch written");
        }
        completion.complete(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc;
    use tempfile::tempdir;

    fn emit_and_wait(sink: &FileSink, logs: Vec<Document>) -> Result<(), ContractError> {
        let (tx, rx) = mpsc::channel();
        let completion = FlushCompletion::new(sink.name().to_string(), move |outcome| {
            tx.send(outcome).unwrap();
        });
        sink.emit(logs, completion);
        rx.recv().unwrap()
    }

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            base_path: dir.path().to_path_buf(),
        };
        let sink = FileSink::new("clicks", config).unwrap();

        let logs: Vec<Document> = (1..=2)
            .map(|seq| {
                let mut log = Document::new();
                log.insert("sequence".to_string(), json!(seq));
                log
            })
            .collect();
        emit_and_wait(&sink, logs.clone()).unwrap();
        emit_and_wait(&sink, logs[..1].to_vec()).unwrap();

        let content = fs::read_to_string(dir.path().join("clicks.jsonl")).unwrap();
        assert_eq!(
            content,
            "{\"sequence\":1}\n{\"sequence\":2}\n{\"sequence\":1}\n"
        );
    }

    #[test]
    fn test_file_sink_reports_write_failure() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            base_path: dir.path().to_path_buf(),
        };
        let sink = FileSink::new("blocked", config).unwrap();
        // A directory where the file should be makes the open fail
        fs::create_dir(sink.path()).unwrap();

        let result = emit_and_wait(&sink, vec![Document::new()]);
        assert!(matches!(result, Err(ContractError::SinkWrite { .. })));
    }

    #[test]
    fn test_file_sink_config_default_path() {
        let config = FileSinkConfig::from_params(&HashMap::new());
        assert_eq!(config.base_path, PathBuf::from("./output"));
    }
}
