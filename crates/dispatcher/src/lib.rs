//! # Dispatcher
//!
//! 日志路由与缓冲投递模块。
//!
//! 负责：
//! - 按 kind 序列化、过滤并扇出日志
//! - 缓冲输出的调度、批量、重试退避与过期清理
//! - 随宿主生命周期暂停 / 恢复 flush
//!
//! 所有可变状态都由单个 worker task 持有，不需要加锁。

pub mod buffered;
pub mod clock;
pub mod error;
pub mod filters;
pub mod lifecycle;
pub mod metrics;
mod registry;
pub mod router;
pub mod sinks;
mod worker;

pub use buffered::BufferedOutput;
pub use clock::TokioClock;
pub use contracts::{
    BufferedOutputConfig, Document, FilterOutcome, LifecycleSignal, LogEvent, LogFilter, LogKind,
};
pub use error::DispatcherError;
pub use filters::{AddTimeFilter, KeepIfFilter, RemoveKeysFilter};
pub use lifecycle::{lifecycle, LifecycleNotifier, LifecycleSignals, RunState};
pub use metrics::{MetricsSnapshot, OutputMetrics};
pub use registry::Output;
pub use router::{Router, RouterBuilder};
pub use sinks::{FileSink, FileSinkConfig, LogSink, NetworkSink, NetworkSinkConfig, SpawnedSink};
