use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use tracing::debug;

use super::write_atomic;
use crate::decode::MessageSet;

/// Write `messages` as one pretty-printed JSON document.
///
/// Top-level keys are message types, values are arrays of row objects.
/// Numeric field keys are written as strings.
pub fn write_json<P: AsRef<Path>>(messages: &MessageSet, path: P) -> Result<()> {
    let path = path.as_ref();
    write_atomic(path, |tmp| {
        let file =
            File::create(tmp).with_context(|| format!("creating {}", tmp.display()))?;
        let mut out = BufWriter::new(file);

        // pretty-print with a trailing newline
        serde_json::to_writer_pretty(&mut out, messages).context("serializing JSON")?;
        out.write_all(b"\n")?;
        out.flush()
            .with_context(|| format!("flushing {}", tmp.display()))?;
        Ok(())
    })?;

    debug!(
        path = %path.display(),
        types = messages.len(),
        rows = messages.row_count(),
        "wrote JSON"
    );
    Ok(())
}
