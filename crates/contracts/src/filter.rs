//! LogFilter trait - per-kind document transforms

use crate::Document;

/// Result of applying a filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Continue the chain with this document
    Keep(Document),
    /// Drop the event; later filters and all sinks are skipped
    Skip,
}

/// Document transform bound to one or more kinds
///
/// Filters are total: dropping an event is expressed with
/// [`FilterOutcome::Skip`], never with a panic or an error.
pub trait LogFilter: Send + Sync {
    /// Apply the filter to a serialized log
    fn apply(&self, log: Document) -> FilterOutcome;
}

/// Filter backed by a closure, see [`filter_fn`]
pub struct FilterFn<F>(F);

/// Wrap a closure as a [`LogFilter`]
pub fn filter_fn<F>(f: F) -> FilterFn<F>
where
    F: Fn(Document) -> FilterOutcome + Send + Sync,
{
    FilterFn(f)
}

impl<F> LogFilter for FilterFn<F>
where
    F: Fn(Document) -> FilterOutcome + Send + Sync,
{
    fn apply(&self, log: Document) -> FilterOutcome {
        (self.0)(log)
    }
}
