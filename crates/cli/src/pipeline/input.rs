//! JSON-lines input → typed events

use std::collections::HashMap;

use contracts::{ContractError, Document, LogEvent, LogKind, LogSerializer, ShipperBlueprint};
use serde_json::Value;

use crate::error::{CliError, Result};

/// A log line whose kind was resolved against the configuration
#[derive(Debug, Clone)]
pub struct RawEvent {
    kind: LogKind,
    body: Document,
}

impl RawEvent {
    pub fn new(kind: LogKind, body: Document) -> Self {
        Self { kind, body }
    }
}

impl LogEvent for RawEvent {
    fn kind(&self) -> LogKind {
        self.kind
    }
}

/// The body already is a document
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerializer;

impl LogSerializer<RawEvent> for RawSerializer {
    fn serialize(&self, event: &RawEvent) -> std::result::Result<Document, ContractError> {
        Ok(event.body.clone())
    }
}

/// Kind names from the configuration, interned for the process lifetime
#[derive(Debug, Default)]
pub struct KindTable {
    kinds: HashMap<String, LogKind>,
}

impl KindTable {
    /// Intern every kind the blueprint references
    ///
    /// Kind names are leaked once at startup; input lines never add kinds.
    pub fn from_blueprint(blueprint: &ShipperBlueprint) -> Self {
        let kinds = blueprint
            .kinds()
            .into_iter()
            .map(|name| {
                let interned: &'static str = Box::leak(name.to_string().into_boxed_str());
                (name.to_string(), LogKind::new(interned))
            })
            .collect();
        Self { kinds }
    }

    pub fn get(&self, name: &str) -> Option<LogKind> {
        self.kinds.get(name).copied()
    }

    /// Resolve configured names; every name in a validated blueprint is known
    pub fn resolve(&self, names: &[String]) -> Vec<LogKind> {
        names.iter().filter_map(|name| self.get(name)).collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }
}

/// Result of parsing one input line
#[derive(Debug)]
pub enum ParsedLine {
    Blank,
    Event(RawEvent),
    /// Well-formed line whose kind no output or filter mentions
    UnknownKind(String),
}

/// Parse one JSON-lines record, taking the kind from `kind_field`
pub fn parse_line(
    line_no: u64,
    line: &str,
    kind_field: &str,
    kinds: &KindTable,
) -> Result<ParsedLine> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ParsedLine::Blank);
    }

    let mut body = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(body)) => body,
        Ok(_) => return Err(CliError::invalid_line(line_no, "expected a JSON object")),
        Err(e) => return Err(CliError::invalid_line(line_no, e.to_string())),
    };

    let name = match body.shift_remove(kind_field) {
        Some(Value::String(name)) => name,
        _ => return Err(CliError::missing_kind(line_no, kind_field)),
    };

    Ok(match kinds.get(&name) {
        Some(kind) => ParsedLine::Event(RawEvent::new(kind, body)),
        None => ParsedLine::UnknownKind(name),
    })
}
