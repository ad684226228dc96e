use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::{collections::HashSet, path::Path};
use tracing::{debug, info};

use super::write_atomic;
use crate::decode::{FieldValue, MessageSet};
use crate::schema::{tabulate, Table};

/// Excel's sheet name length limit.
const MAX_SHEET_NAME: usize = 31;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];
/// Sheet used when there are no message types at all; a workbook needs one.
pub const EMPTY_SHEET: &str = "empty";

/// Write `messages` as a workbook with one sheet per message type.
pub fn write_xlsx<P: AsRef<Path>>(messages: &MessageSet, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = build_workbook(messages)?;
    write_atomic(path, |tmp| {
        workbook
            .save(tmp)
            .with_context(|| format!("saving workbook {}", tmp.display()))
    })
}

/// Lay out every message type as a sheet: headers in row 1, then one row per
/// record in decode order. Types without rows still get a (header-only) sheet.
pub fn build_workbook(messages: &MessageSet) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();

    for (message_type, rows) in messages.iter() {
        let table = tabulate(message_type, rows);
        let name = sheet_name(message_type, &mut used);
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(name.as_str())
            .with_context(|| format!("naming sheet {:?}", name))?;
        write_table(worksheet, &table)
            .with_context(|| format!("writing sheet {:?}", name))?;
    }

    if messages.is_empty() {
        workbook.add_worksheet().set_name(EMPTY_SHEET)?;
    }

    Ok(workbook)
}

fn write_table(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    info!(
        "writing {} rows of {} columns to {} sheet",
        table.height(),
        table.width(),
        table.name
    );
    debug!("headers: {}", table.headers.join(", "));

    for (idx, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, column(idx)?, header.as_str())?;
    }

    for (idx, cells) in table.rows.iter().enumerate() {
        let row = u32::try_from(idx + 1).context("row index exceeds sheet limits")?;
        for (col, value) in cells.iter().enumerate() {
            write_cell(worksheet, row, column(col)?, value)?;
        }
    }

    Ok(())
}

fn column(idx: usize) -> Result<u16> {
    u16::try_from(idx).context("column index exceeds sheet limits")
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &FieldValue) -> Result<()> {
    match value {
        // placeholder: leave the cell blank
        FieldValue::Text(s) if s.is_empty() => {}
        FieldValue::Text(s) => {
            worksheet.write_string(row, col, s.as_str())?;
        }
        FieldValue::Int(v) => {
            worksheet.write_number(row, col, *v as f64)?;
        }
        FieldValue::UInt(v) => {
            worksheet.write_number(row, col, *v as f64)?;
        }
        FieldValue::Float(v) if v.is_finite() => {
            worksheet.write_number(row, col, *v)?;
        }
        FieldValue::Float(v) => {
            worksheet.write_string(row, col, v.to_string().as_str())?;
        }
        FieldValue::Bool(v) => {
            worksheet.write_boolean(row, col, *v)?;
        }
        FieldValue::Timestamp(ts) => {
            worksheet.write_string(row, col, FieldValue::iso_timestamp(ts).as_str())?;
        }
        FieldValue::Array(_) => {
            let text = serde_json::to_string(value).context("rendering array cell")?;
            worksheet.write_string(row, col, text.as_str())?;
        }
    }
    Ok(())
}

/// Excel-safe, case-insensitively unique sheet name for `message_type`.
pub fn sheet_name(message_type: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = message_type
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('\'');
    let base: String = if cleaned.is_empty() {
        "sheet".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!("~{}", n);
        let keep = MAX_SHEET_NAME - suffix.len();
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    candidate
}
