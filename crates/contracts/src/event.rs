//! LogEvent / Document - what applications post
//!
//! An event is an application value tagged with a [`LogKind`]. The router
//! serializes it into a [`Document`], the ordered key-value shape that filters
//! and sinks operate on.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ContractError;

/// Ordered JSON object; keys keep insertion order.
pub type Document = Map<String, Value>;

/// Stable identifier of a category of log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogKind(&'static str);

impl LogKind {
    /// Create a kind from a static name
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Kind name
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A typed log event
///
/// Usually implemented on an enum covering every kind the application emits.
pub trait LogEvent: Send + 'static {
    /// The registry key of this event
    fn kind(&self) -> LogKind;
}

/// Converts events into documents
///
/// Runs on the router's worker, never concurrently with itself.
pub trait LogSerializer<E>: Send + 'static {
    /// Serialize one event
    ///
    /// # Errors
    /// Returns [`ContractError::Serialize`] if the event cannot be represented
    /// as a JSON object.
    fn serialize(&self, event: &E) -> Result<Document, ContractError>;
}

/// Serializer for events that implement [`serde::Serialize`]
///
/// The event must serialize to a JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl<E> LogSerializer<E> for JsonSerializer
where
    E: LogEvent + Serialize,
{
    fn serialize(&self, event: &E) -> Result<Document, ContractError> {
        match serde_json::to_value(event) {
            Ok(Value::Object(log)) => Ok(log),
            Ok(other) => Err(ContractError::serialize(
                event.kind().as_str(),
                format!("expected a JSON object, got {}", json_type_name(&other)),
            )),
            Err(e) => Err(ContractError::serialize(event.kind().as_str(), e.to_string())),
        }
    }
}

/// Serializer backed by a closure, see [`serializer_fn`]
pub struct SerializerFn<F>(F);

/// Wrap a closure as a [`LogSerializer`]
pub fn serializer_fn<E, F>(f: F) -> SerializerFn<F>
where
    F: Fn(&E) -> Result<Document, ContractError> + Send + 'static,
{
    SerializerFn(f)
}

impl<E, F> LogSerializer<E> for SerializerFn<F>
where
    F: Fn(&E) -> Result<Document, ContractError> + Send + 'static,
{
    fn serialize(&self, event: &E) -> Result<Document, ContractError> {
        (self.0)(event)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
