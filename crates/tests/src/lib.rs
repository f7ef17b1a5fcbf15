//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 → 路由器的装配
//! - 持久化存储跨重启的重投递
//! - 文件 sink 的端到端输出

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        let _ = contracts::BufferedOutputConfig::default();
    }

    #[test]
    fn test_metrics_without_recorder_are_noops() {
        observability::describe_metrics();
        observability::record_log_posted("checkout");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        BufferedSink, ContractError, Document, FlushCompletion, JsonSerializer, LogEvent,
        LogKind, LogStore, NewEntry, StoreConfig,
    };
    use dispatcher::{
        lifecycle, AddTimeFilter, BufferedOutput, FileSink, LifecycleSignal, Output,
        RemoveKeysFilter, Router, TokioClock,
    };
    use log_store::{FileLogStore, MemoryLogStore};
    use serde::Serialize;
    use tempfile::tempdir;

    const CHECKOUT: LogKind = LogKind::new("checkout");
    const AUDIT: LogKind = LogKind::new("audit");

    #[derive(Debug, Serialize)]
    #[serde(tag = "event", rename_all = "snake_case")]
    enum AppEvent {
        Checkout { order: u64, card: String },
        Audit { order: u64 },
    }

    impl LogEvent for AppEvent {
        fn kind(&self) -> LogKind {
            match self {
                AppEvent::Checkout { .. } => CHECKOUT,
                AppEvent::Audit { .. } => AUDIT,
            }
        }
    }

    fn checkout(order: u64) -> AppEvent {
        AppEvent::Checkout {
            order,
            card: "4111".to_string(),
        }
    }

    /// Sink that records every batch and can be switched to fail
    #[derive(Default)]
    struct Collector {
        batches: Mutex<Vec<Vec<Document>>>,
        offline: Mutex<bool>,
    }

    impl Collector {
        fn orders(&self) -> Vec<Vec<u64>> {
            self.batches
                .lock()
                .unwrap()
                .iter()
                .map(|batch| batch.iter().map(|log| log["order"].as_u64().unwrap()).collect())
                .collect()
        }
    }

    impl BufferedSink for Collector {
        fn name(&self) -> &str {
            "collector"
        }

        fn emit(&self, logs: Vec<Document>, completion: FlushCompletion) {
            self.batches.lock().unwrap().push(logs);
            if *self.offline.lock().unwrap() {
                completion.fail(ContractError::sink_write("collector", "offline"));
            } else {
                completion.succeed();
            }
        }
    }

    fn collector_output(sink: &Arc<Collector>, interval: Duration) -> Output {
        let sink: Arc<dyn BufferedSink> = sink.clone();
        BufferedOutput::from_arc("collector", sink)
            .with_config(
                contracts::BufferedOutputConfig::default()
                    .with_flush_interval(interval)
                    .with_max_retry_count(1),
            )
            .into()
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    /// Undelivered logs in a file store are redelivered by the next router
    #[tokio::test(start_paused = true)]
    async fn test_file_store_redelivers_after_restart() {
        let dir = tempdir().unwrap();
        let interval = Duration::from_secs(30);

        // First run: the collector is offline, nothing gets deleted
        let first = Arc::new(Collector::default());
        *first.offline.lock().unwrap() = true;
        let router = Router::builder(JsonSerializer, FileLogStore::open(dir.path()).unwrap())
            .clock(Arc::new(TokioClock::new()))
            .output(collector_output(&first, interval), &[CHECKOUT])
            .build()
            .unwrap();
        for order in 1..=3 {
            router.post(checkout(order)).unwrap();
        }
        settle().await;
        tokio::time::advance(interval).await;
        settle().await;
        router.shutdown().await.unwrap();
        assert_eq!(first.orders(), vec![vec![1, 2, 3]]);

        let reopened = FileLogStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len("collector"), 3);

        // Second run: same directory, collector back online
        let second = Arc::new(Collector::default());
        let router = Router::builder(JsonSerializer, reopened)
            .clock(Arc::new(TokioClock::new()))
            .output(collector_output(&second, interval), &[CHECKOUT])
            .build()
            .unwrap();
        router.post(checkout(4)).unwrap();
        settle().await;
        tokio::time::advance(interval).await;
        settle().await;
        router.shutdown().await.unwrap();

        assert_eq!(second.orders(), vec![vec![1, 2, 3, 4]]);
        assert!(FileLogStore::open(dir.path()).unwrap().is_empty("collector"));
    }

    /// Blueprint tunables and filters flow into a file-backed output
    #[tokio::test]
    async fn test_blueprint_drives_file_output() {
        let out_dir = tempdir().unwrap();
        let store_dir = tempdir().unwrap();
        let content = format!(
            r#"
[store]
type = "file"
path = "{store}"
sync_writes = false

[[filters]]
filter_type = "remove_keys"
kinds = ["checkout"]
params = {{ keys = "card" }}

[[outputs]]
name = "orders"
sink_type = "file"
kinds = ["checkout", "audit"]
params = {{ base_path = "{out}" }}
buffer = {{ flush_interval_ms = 3600000, logs_per_flush = 2 }}
"#,
            store = store_dir.path().display(),
            out = out_dir.path().display(),
        );
        let blueprint = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        assert!(matches!(
            blueprint.store,
            StoreConfig::File { sync_writes: false, .. }
        ));

        let output = &blueprint.outputs[0];
        assert!(output.is_buffered());
        let config = output.buffered_output_config();
        assert_eq!(config.logs_per_flush, 2);

        let sink = FileSink::from_params(output.name.as_str(), &output.params).unwrap();
        let path = sink.path().clone();
        let store = FileLogStore::open(store_dir.path()).unwrap().without_sync();
        let router = Router::builder(JsonSerializer, store)
            .filter(RemoveKeysFilter::new(["card"]), &[CHECKOUT])
            .output(
                BufferedOutput::new(output.name.as_str(), sink).with_config(config),
                &[CHECKOUT, AUDIT],
            )
            .build()
            .unwrap();

        router.post(checkout(7)).unwrap();
        router.post(AppEvent::Audit { order: 7 }).unwrap();
        router.post(checkout(8)).unwrap();
        router.flush_all().unwrap();
        router.shutdown().await.unwrap();

        // logs_per_flush caps the manual flush at two entries
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "{\"event\":\"checkout\",\"order\":7}\n{\"event\":\"audit\",\"order\":7}\n"
        );
        assert_eq!(FileLogStore::open(store_dir.path()).unwrap().len("orders"), 1);
    }

    /// Suspension holds scheduled flushes; resuming delivers what came due
    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_gates_scheduled_flushes() {
        let interval = Duration::from_secs(10);
        let sink = Arc::new(Collector::default());
        let (notifier, signals) = lifecycle(LifecycleSignal::Active);
        let router = Router::builder(JsonSerializer, MemoryLogStore::new())
            .clock(Arc::new(TokioClock::new()))
            .lifecycle(signals)
            .filter(AddTimeFilter::new(), &[AUDIT])
            .output(collector_output(&sink, interval), &[AUDIT])
            .build()
            .unwrap();

        router.post(AppEvent::Audit { order: 1 }).unwrap();
        settle().await;
        notifier.inactive();
        settle().await;

        tokio::time::advance(interval * 3).await;
        settle().await;
        assert!(sink.orders().is_empty());

        notifier.active();
        settle().await;
        assert_eq!(sink.orders(), vec![vec![1]]);

        let batches = sink.batches.lock().unwrap().clone();
        assert!(batches[0][0].contains_key("time"));
        drop(batches);

        let metrics = router.output_metrics("collector").unwrap();
        assert_eq!(metrics.enqueued_count, 1);
        assert_eq!(metrics.flushed_count, 1);
        router.shutdown().await.unwrap();
    }

    #[test]
    fn test_memory_store_partitions_are_independent() {
        let mut store = MemoryLogStore::new();
        let now = chrono::Utc::now();
        let log: Document = serde_json::from_str(r#"{"order":1}"#).unwrap();
        let entry = NewEntry {
            created_at: now,
            log,
        };
        store.append("a", entry.clone()).unwrap();
        store.append("b", entry).unwrap();

        assert_eq!(store.fetch("a", 10).unwrap().len(), 1);
        assert_eq!(store.delete_older_than("b", now).unwrap(), 1);
        assert!(store.is_empty("b"));
        assert_eq!(store.len("a"), 1);
    }
}
