//! Flat key-value snapshot of any serializable result.
//!
//! Nested fields become dotted keys (`summary.npv`), sequence elements take
//! their index (`projection.0.net_cash_flow`).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Dotted-key map with scalar leaves, sorted by key.
pub type Snapshot = BTreeMap<String, Value>;

/// Flattens a value into a [`Snapshot`].
///
/// Empty objects and arrays produce no keys. `None` fields appear as `null`.
///
/// # Errors
///
/// Returns `Error::Json` if the value cannot be serialized.
pub fn flatten(value: &impl Serialize) -> Result<Snapshot> {
    let mut out = Snapshot::new();
    walk(String::new(), serde_json::to_value(value)?, &mut out);
    Ok(out)
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn walk(prefix: String, value: Value, out: &mut Snapshot) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(join(&prefix, &key), child, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.into_iter().enumerate() {
                walk(join(&prefix, &i.to_string()), child, out);
            }
        }
        leaf => {
            out.insert(prefix, leaf);
        }
    }
}

/// Writes a snapshot as a pretty-printed JSON object.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_snapshot(snapshot: &Snapshot, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writeln!(writer)
}

/// Writes a snapshot to a JSON file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_snapshot(snapshot: &Snapshot, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut buf = io::BufWriter::new(file);
    write_snapshot(snapshot, &mut buf)?;
    buf.flush()
}
