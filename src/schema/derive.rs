use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::decode::{FieldValue, Record};

/// One message type laid out as a rectangle: a header row plus one value per
/// header for every record.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl Table {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Column headers for a message type:
///  - union of the keys of *every* row, not just the first
///  - first-seen order
///  - numeric placeholders and integer-like names left out
pub fn derive_headers(rows: &[Record]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut headers = Vec::new();

    for row in rows {
        for key in row.keys() {
            if key.is_synthetic() {
                continue;
            }
            if let Some(name) = key.as_name() {
                if seen.insert(name) {
                    headers.push(name.to_string());
                }
            }
        }
    }

    headers
}

/// Exactly one value per header: missing fields become `""`, timestamps
/// become ISO-8601 text, arrays become compact JSON text.
pub fn rectangularize(row: &Record, headers: &[String]) -> Vec<FieldValue> {
    let by_name: HashMap<&str, &FieldValue> = row
        .iter()
        .filter_map(|(k, v)| k.as_name().map(|name| (name, v)))
        .collect();

    headers
        .iter()
        .map(|h| match by_name.get(h.as_str()) {
            Some(value) => cell_value(value),
            None => FieldValue::blank(),
        })
        .collect()
}

fn cell_value(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Timestamp(ts) => FieldValue::Text(FieldValue::iso_timestamp(ts)),
        FieldValue::Array(_) => {
            FieldValue::Text(serde_json::to_string(value).unwrap_or_default())
        }
        other => other.clone(),
    }
}

/// Derive headers over all of `rows`, then lay every row out against them.
pub fn tabulate(name: &str, rows: &[Record]) -> Table {
    let headers = derive_headers(rows);
    debug!(
        message_type = name,
        rows = rows.len(),
        columns = headers.len(),
        "derived headers"
    );
    let rows = rows.iter().map(|r| rectangularize(r, &headers)).collect();
    Table {
        name: name.to_string(),
        headers,
        rows,
    }
}
