// src/decode/types.rs

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, fmt};

/// Key of a single field within a decoded record.
///
/// Fields the profile does not name come back from the decoder as bare field
/// numbers; they are kept so JSON output stays lossless, but they never become
/// spreadsheet columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name(String),
    Number(u8),
}

impl FieldKey {
    /// True for numeric placeholders and names that are just an integer.
    pub fn is_synthetic(&self) -> bool {
        match self {
            FieldKey::Number(_) => true,
            FieldKey::Name(name) => name.trim().parse::<i64>().is_ok(),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            FieldKey::Name(name) => Some(name),
            FieldKey::Number(_) => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Name(name) => f.write_str(name),
            FieldKey::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        FieldKey::Name(name.to_string())
    }
}

impl From<u8> for FieldKey {
    fn from(n: u8) -> Self {
        FieldKey::Number(n)
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// The empty-string placeholder used for absent cells.
    pub fn blank() -> Self {
        FieldValue::Text(String::new())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }

    /// ISO-8601 rendering used for timestamps in every output format.
    pub fn iso_timestamp(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::UInt(v) => serializer.serialize_u64(*v),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Bool(v) => serializer.serialize_bool(*v),
            FieldValue::Timestamp(ts) => serializer.serialize_str(&Self::iso_timestamp(ts)),
            FieldValue::Array(values) => serializer.collect_seq(values),
        }
    }
}

/// One decoded row: an ordered, sparse field → value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(FieldKey, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. A key already present keeps its first value.
    pub fn insert(&mut self, key: impl Into<FieldKey>, value: FieldValue) {
        let key = key.into();
        if self.fields.iter().any(|(k, _)| *k == key) {
            return;
        }
        self.fields.push((key, value));
    }

    pub fn with(mut self, key: impl Into<FieldKey>, value: FieldValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a named field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k.as_name() == Some(name))
            .map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// Numeric keys are coerced to strings so the record is always a valid JSON object.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter().map(|(k, v)| (k.to_string(), v)))
    }
}

/// All records decoded from one file, grouped by message type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MessageSet {
    messages: BTreeMap<String, Vec<Record>>,
}

impl MessageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` to the rows of `message_type`, keeping decode order.
    pub fn push(&mut self, message_type: &str, record: Record) {
        self.messages
            .entry(message_type.to_string())
            .or_default()
            .push(record);
    }

    /// Register a message type without rows.
    pub fn ensure(&mut self, message_type: &str) {
        self.messages.entry(message_type.to_string()).or_default();
    }

    pub fn get(&self, message_type: &str) -> Option<&[Record]> {
        self.messages.get(message_type).map(Vec::as_slice)
    }

    pub fn contains(&self, message_type: &str) -> bool {
        self.messages.contains_key(message_type)
    }

    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.messages
            .iter()
            .map(|(k, rows)| (k.as_str(), rows.as_slice()))
    }

    /// Keep only the message types for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.messages.retain(|k, _| keep(k));
    }

    /// Number of message types.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total rows across every message type.
    pub fn row_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }
}
