// src/decode/mod.rs
pub mod types;

pub use types::{FieldKey, FieldValue, MessageSet, Record};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use fitparser::de::{from_bytes_with_options, DecodeOption, FitObject, FitStreamProcessor};
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use std::{collections::HashSet, io::Read};
use tracing::{debug, warn};

/// Prefix fitparser gives fields missing from the profile.
const UNKNOWN_FIELD_PREFIX: &str = "unknown_field_";

/// Result of decoding one file: whatever could be parsed, plus the
/// non-fatal problems met along the way.
#[derive(Debug, Default)]
pub struct Decoded {
    pub messages: MessageSet,
    pub errors: Vec<String>,
}

/// Turns a FIT byte stream into a [`MessageSet`].
///
/// Recoverable problems go into [`Decoded::errors`]; `Err` means nothing
/// usable could be read.
pub trait Decoder {
    fn decode(&self, reader: &mut dyn Read) -> Result<Decoded>;
}

/// [`Decoder`] backed by the `fitparser` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FitDecoder;

impl Decoder for FitDecoder {
    fn decode(&self, reader: &mut dyn Read) -> Result<Decoded> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .context("reading FIT stream")?;
        if buf.is_empty() {
            bail!("empty FIT stream");
        }

        let (mut records, mut errors) = decode_stream(&buf);

        // nothing survived the strict pass: retry once with CRC checks off
        if records.is_empty() && !errors.is_empty() {
            warn!("strict decode yielded no records, retrying without CRC checks");
            let lenient: HashSet<DecodeOption> = [
                DecodeOption::SkipHeaderCrcValidation,
                DecodeOption::SkipDataCrcValidation,
            ]
            .into_iter()
            .collect();
            records = from_bytes_with_options(&buf, &lenient).map_err(|e| {
                anyhow!("decoding FIT data: {} (strict: {})", e, errors.join("; "))
            })?;
        }
        if records.is_empty() && !errors.is_empty() {
            bail!("decoding FIT data: {}", errors.join("; "));
        }
        errors.dedup();

        let mut messages = MessageSet::new();
        for record in &records {
            let (kind, row) = convert_record(record);
            messages.push(&kind, row);
        }
        debug!(
            types = messages.len(),
            rows = messages.row_count(),
            "decoded FIT stream"
        );

        Ok(Decoded { messages, errors })
    }
}

/// Name used for a message type: the snake_case profile name, or the bare
/// message number for types the profile does not know.
pub fn message_type_name(kind: MesgNum) -> String {
    match kind {
        MesgNum::Value(n) => n.to_string(),
        known => known.to_string(),
    }
}

/// Walk the byte stream object by object, keeping every record decoded
/// before the first unreadable object. Chained FIT files are followed.
fn decode_stream(buf: &[u8]) -> (Vec<FitDataRecord>, Vec<String>) {
    let mut input = buf;
    let mut processor = FitStreamProcessor::new();
    let mut records = Vec::new();
    let mut errors = Vec::new();

    while !input.is_empty() {
        let (rest, object) = match processor.deserialize_next(input) {
            Ok(next) => next,
            Err(e) => {
                warn!(
                    offset = buf.len() - input.len(),
                    decoded = records.len(),
                    "stopping decode: {}",
                    e
                );
                errors.push(format!("{}", e));
                break;
            }
        };
        match object {
            FitObject::Crc(_) => processor.reset(),
            FitObject::DataMessage(msg) => match processor.decode_message(msg) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!("skipping undecodable message: {}", e);
                    errors.push(format!("{}", e));
                }
            },
            _ => {}
        }
        input = rest;
    }

    (records, errors)
}

fn convert_record(record: &FitDataRecord) -> (String, Record) {
    let mut row = Record::new();
    for field in record.fields() {
        let Some(value) = convert_value(field.value()) else {
            continue;
        };
        let name = field.name();
        if name.starts_with(UNKNOWN_FIELD_PREFIX) {
            row.insert(FieldKey::Number(field.number()), value);
        } else {
            row.insert(name, value);
        }
    }
    (message_type_name(record.kind()), row)
}

/// Map a fitparser value onto the crate's value model. Invalid markers map
/// to `None` and the field is dropped.
pub fn convert_value(value: &Value) -> Option<FieldValue> {
    let converted = match value {
        Value::Timestamp(ts) => FieldValue::Timestamp(ts.with_timezone(&Utc)),
        Value::Byte(v) | Value::Enum(v) | Value::UInt8(v) | Value::UInt8z(v) => {
            FieldValue::UInt(u64::from(*v))
        }
        Value::UInt16(v) | Value::UInt16z(v) => FieldValue::UInt(u64::from(*v)),
        Value::UInt32(v) | Value::UInt32z(v) => FieldValue::UInt(u64::from(*v)),
        Value::UInt64(v) | Value::UInt64z(v) => FieldValue::UInt(*v),
        Value::SInt8(v) => FieldValue::Int(i64::from(*v)),
        Value::SInt16(v) => FieldValue::Int(i64::from(*v)),
        Value::SInt32(v) => FieldValue::Int(i64::from(*v)),
        Value::SInt64(v) => FieldValue::Int(*v),
        Value::Float32(v) => FieldValue::Float(f64::from(*v)),
        Value::Float64(v) => FieldValue::Float(*v),
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Array(values) => {
            FieldValue::Array(values.iter().filter_map(convert_value).collect())
        }
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(converted)
}
