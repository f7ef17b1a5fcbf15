//! 投递指标模块
//!
//! 路由 (post / filter) 与缓冲输出 (enqueue / flush / purge) 的计数器。
//! 未安装 recorder 时所有调用都是空操作。

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// 单次 flush 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// 批次已送达
    Success,
    /// sink 报告失败
    Failure,
    /// 批次为空，未调用 sink
    Empty,
}

impl FlushStatus {
    fn as_str(self) -> &'static str {
        match self {
            FlushStatus::Success => "success",
            FlushStatus::Failure => "failure",
            FlushStatus::Empty => "empty",
        }
    }
}

/// 注册指标说明 (安装 recorder 后调用一次)
pub fn describe_metrics() {
    describe_counter!("logship_logs_posted_total", "Events accepted by Router::post");
    describe_counter!("logship_logs_skipped_total", "Events dropped by a filter");
    describe_counter!("logship_logs_enqueued_total", "Logs appended to a buffered output");
    describe_counter!("logship_flushes_total", "Flush cycles by status");
    describe_counter!("logship_logs_flushed_total", "Logs delivered by successful flushes");
    describe_histogram!("logship_flush_batch_size", "Logs per successful flush");
    describe_counter!("logship_logs_purged_total", "Logs deleted by age");
    describe_counter!(
        "logship_backoff_exhausted_total",
        "Backoff streaks that ran past max_retry_count"
    );
    describe_counter!("logship_store_failures_total", "Failed store operations");
}

/// 记录一次 post
pub fn record_log_posted(kind: &str) {
    counter!("logship_logs_posted_total", "kind" => kind.to_string()).increment(1);
}

/// 记录被过滤器丢弃的日志
pub fn record_log_skipped(kind: &str) {
    counter!("logship_logs_skipped_total", "kind" => kind.to_string()).increment(1);
}

/// 记录写入缓冲区的日志
pub fn record_log_enqueued(output: &str) {
    counter!("logship_logs_enqueued_total", "output" => output.to_string()).increment(1);
}

/// 记录一次 flush
///
/// # Example
///
/// ```ignore
/// record_flush("logcat_debug", FlushStatus::Failure, 100);
/// ```
pub fn record_flush(output: &str, status: FlushStatus, batch_len: usize) {
    counter!(
        "logship_flushes_total",
        "output" => output.to_string(),
        "status" => status.as_str()
    )
    .increment(1);

    if status == FlushStatus::Success {
        counter!("logship_logs_flushed_total", "output" => output.to_string())
            .increment(batch_len as u64);
        histogram!("logship_flush_batch_size", "output" => output.to_string())
            .record(batch_len as f64);
    }
}

/// 记录按年龄清理的日志数
pub fn record_logs_purged(output: &str, purged: usize) {
    if purged > 0 {
        counter!("logship_logs_purged_total", "output" => output.to_string())
            .increment(purged as u64);
    }
}

/// 记录一次退避序列耗尽 (回到正常周期)
pub fn record_backoff_exhausted(output: &str) {
    counter!("logship_backoff_exhausted_total", "output" => output.to_string()).increment(1);
}

/// 记录存储层失败
pub fn record_store_failure(output: &str, operation: &'static str) {
    counter!(
        "logship_store_failures_total",
        "output" => output.to_string(),
        "operation" => operation
    )
    .increment(1);
}
