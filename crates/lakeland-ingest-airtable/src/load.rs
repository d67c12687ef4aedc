//! Locating and reading table exports.
//!
//! Each table is exported as `<table>.json` (any letter case) holding a JSON
//! array of flat objects.

use std::path::{Path, PathBuf};

use lakeland_model::SourceTable;
use serde_json::Value;

use crate::error::IngestError;

/// Extension of export files.
pub const EXPORT_EXTENSION: &str = "json";

/// Find the export file for `table` in `dir`, matching names case-insensitively.
///
/// Entries are scanned in sorted order so the choice is stable when a
/// directory holds both a current and a synonym file name.
pub fn find_table_file(dir: &Path, table: SourceTable) -> Result<Option<PathBuf>, IngestError> {
    let io_err = |source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        let is_export = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case(EXPORT_EXTENSION));
        if !is_export {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if SourceTable::from_name(name).ok() == Some(table) {
            candidates.push(path);
        }
    }

    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Read one export file as a list of raw rows.
pub fn load_rows(path: &Path) -> Result<Vec<Value>, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| IngestError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Array(rows) => Ok(rows),
        _ => Err(IngestError::NotAnArray {
            path: path.to_path_buf(),
        }),
    }
}

/// Load the rows of `table` from `dir`.
///
/// A missing export is not an error: the table is treated as empty.
pub fn load_table(dir: &Path, table: SourceTable) -> Result<Vec<Value>, IngestError> {
    match find_table_file(dir, table)? {
        Some(path) => {
            let rows = load_rows(&path)?;
            tracing::debug!(table = %table, path = %path.display(), rows = rows.len(), "loaded export");
            Ok(rows)
        }
        None => {
            tracing::warn!(table = %table, dir = %dir.display(), "no export file found; treating table as empty");
            Ok(Vec::new())
        }
    }
}
