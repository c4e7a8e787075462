use log::info;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{TaskError, TaskResult};
use crate::store::write_atomic;
use crate::task::Task;

/// The header is the union of every record's keys in first-seen order, so
/// legacy records missing a key get an empty cell.
pub fn to_csv(tasks: &[Task]) -> Vec<u8> {
    if tasks.is_empty() {
        return Vec::new();
    }
    let records: Vec<Value> = tasks
        .iter()
        .map(|t| serde_json::to_value(t).unwrap_or(Value::Null))
        .collect();

    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut out = String::new();
    push_row(&mut out, columns.iter().map(String::as_str).map(escape));
    for record in &records {
        push_row(
            &mut out,
            columns
                .iter()
                .map(|key| escape(&cell(record.get(key)))),
        );
    }
    out.into_bytes()
}

pub fn export_to(tasks: &[Task], path: &Path) -> TaskResult<PathBuf> {
    write_atomic(path, &to_csv(tasks)).map_err(|source| TaskError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Exported {} tasks to {:?}", tasks.len(), path);
    Ok(path.to_path_buf())
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let row: Vec<String> = cells.collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Quote only when the field holds a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
