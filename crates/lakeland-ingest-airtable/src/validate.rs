//! Source record validation.
//!
//! For one table:
//! 1) collect every column label observed across all rows,
//! 2) fail the whole table if any label is missing from the field mapping,
//! 3) per row: rename labels, drop retired columns, unwrap singleton lists,
//!    and deserialize the table's record type,
//! 4) isolate per-row failures as [`RecordError`]s and keep going.
//!
//! Rows may be constructed in parallel; results are always reported in input
//! order, so sequential and parallel runs are indistinguishable.

use std::collections::HashSet;
use std::fmt;

use lakeland_model::{
    AccessionSourceRecord, EntityRelationshipSourceRecord, EntitySourceRecord, FieldValue,
    FileSourceRecord, ItemSourceRecord, SourceRecord, SourceTable, SubjectSourceRecord,
};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{IngestError, SchemaDriftError};
use crate::mappings::{is_retired, mapping_for, FieldMapping};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Construct rows on the rayon pool.
    pub parallel: bool,
}

/// A row that could not be turned into a source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub table: SourceTable,
    /// Zero-based position of the row in the export.
    pub row: usize,
    pub external_id: String,
    pub hint: String,
    pub cause: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error loading record {} {}: {}",
            self.external_id, self.hint, self.cause
        )
    }
}

/// Outcome of validating one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<R> {
    pub records: Vec<R>,
    pub errors: Vec<RecordError>,
}

impl<R> Validated<R> {
    /// Rows seen; always `records.len() + errors.len()`.
    pub fn input_rows(&self) -> usize {
        self.records.len() + self.errors.len()
    }
}

/// Column labels observed across all rows, in order of first appearance.
pub fn observed_fields(rows: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if seen.insert(key.as_str()) {
                    ordered.push(key.clone());
                }
            }
        }
    }
    ordered
}

/// Check that every observed column is mapped.
pub fn check_key_mappings(observed: &[String], mapping: &FieldMapping) -> Result<(), SchemaDriftError> {
    let unmapped: Vec<String> = observed
        .iter()
        .filter(|label| !mapping.contains(label))
        .cloned()
        .collect();

    match unmapped.first() {
        None => Ok(()),
        Some(first) => Err(SchemaDriftError {
            table: mapping.table,
            field: first.clone(),
            unmapped,
        }),
    }
}

fn rename_row(row: &Map<String, Value>, mapping: &FieldMapping) -> Result<Map<String, Value>, String> {
    let mut renamed = Map::new();
    let mut sources: Vec<(&'static str, &str)> = Vec::new();

    for (label, value) in row {
        // Drift was checked for the whole table before any row is renamed.
        let Some(canonical) = mapping.get(label) else {
            return Err(format!("column `{label}` has no mapping"));
        };
        if is_retired(canonical) {
            continue;
        }
        if let Some((_, first)) = sources.iter().find(|(c, _)| *c == canonical) {
            return Err(format!(
                "columns `{first}` and `{label}` both map to `{canonical}`"
            ));
        }
        sources.push((canonical, label.as_str()));

        if let Some(v) = FieldValue::normalize(value.clone()).into_json() {
            renamed.insert(canonical.to_string(), v);
        }
    }

    Ok(renamed)
}

fn external_id_of(row: &Map<String, Value>) -> String {
    match row.get("external_id").cloned().map(FieldValue::normalize) {
        Some(FieldValue::Scalar(Value::String(id))) => id,
        _ => "<unknown>".to_string(),
    }
}

fn construct<R: SourceRecord>(
    index: usize,
    row: &Value,
    mapping: &FieldMapping,
) -> Result<R, RecordError> {
    let fail = |external_id: String, hint: String, cause: String| RecordError {
        table: R::TABLE,
        row: index,
        external_id,
        hint,
        cause,
    };

    let Value::Object(raw) = row else {
        return Err(fail(
            "<unknown>".to_string(),
            format!("({}) <row {index}>", R::TABLE.entity_hint()),
            "row is not a JSON object".to_string(),
        ));
    };

    let renamed = rename_row(raw, mapping).map_err(|cause| {
        let mut labelled = Map::new();
        for (label, value) in raw {
            if let Some(canonical) = mapping.get(label) {
                labelled.insert(canonical.to_string(), value.clone());
            }
        }
        fail(external_id_of(&labelled), R::describe_row(&labelled), cause)
    })?;

    let external_id = external_id_of(&renamed);
    let hint = R::describe_row(&renamed);
    serde_json::from_value::<R>(Value::Object(renamed))
        .map_err(|e| fail(external_id, hint, e.to_string()))
}

/// Validate the rows of one table into typed records.
///
/// Only schema drift is returned as `Err`; every row-level problem becomes a
/// [`RecordError`] in the result.
pub fn validate_records<R: SourceRecord>(
    rows: &[Value],
    options: ValidateOptions,
) -> Result<Validated<R>, SchemaDriftError> {
    let table = R::TABLE;
    let mapping = mapping_for(table);

    let observed = observed_fields(rows);
    if let Err(err) = check_key_mappings(&observed, &mapping) {
        tracing::error!(table = %table, field = %err.field, "extant column not found in field mapping");
        return Err(err);
    }

    let results: Vec<Result<R, RecordError>> = if options.parallel {
        rows.par_iter()
            .enumerate()
            .map(|(i, row)| construct::<R>(i, row, &mapping))
            .collect()
    } else {
        rows.iter()
            .enumerate()
            .map(|(i, row)| construct::<R>(i, row, &mapping))
            .collect()
    };

    let mut records = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(
                    table = %err.table,
                    row = err.row,
                    external_id = %err.external_id,
                    hint = %err.hint,
                    cause = %err.cause,
                    "record failed validation"
                );
                errors.push(err);
            }
        }
    }

    tracing::info!(
        table = %table,
        validated = records.len(),
        failed = errors.len(),
        "validated table"
    );

    Ok(Validated { records, errors })
}

/// Validated records of any table.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceBatch {
    Accessions(Validated<AccessionSourceRecord>),
    Files(Validated<FileSourceRecord>),
    Items(Validated<ItemSourceRecord>),
    Entities(Validated<EntitySourceRecord>),
    Subjects(Validated<SubjectSourceRecord>),
    Relationships(Validated<EntityRelationshipSourceRecord>),
}

impl SourceBatch {
    pub fn table(&self) -> SourceTable {
        match self {
            SourceBatch::Accessions(_) => SourceTable::Accessions,
            SourceBatch::Files(_) => SourceTable::Files,
            SourceBatch::Items(_) => SourceTable::Items,
            SourceBatch::Entities(_) => SourceTable::Entities,
            SourceBatch::Subjects(_) => SourceTable::Subjects,
            SourceBatch::Relationships(_) => SourceTable::Relationships,
        }
    }

    pub fn validated(&self) -> usize {
        match self {
            SourceBatch::Accessions(v) => v.records.len(),
            SourceBatch::Files(v) => v.records.len(),
            SourceBatch::Items(v) => v.records.len(),
            SourceBatch::Entities(v) => v.records.len(),
            SourceBatch::Subjects(v) => v.records.len(),
            SourceBatch::Relationships(v) => v.records.len(),
        }
    }

    pub fn errors(&self) -> &[RecordError] {
        match self {
            SourceBatch::Accessions(v) => &v.errors,
            SourceBatch::Files(v) => &v.errors,
            SourceBatch::Items(v) => &v.errors,
            SourceBatch::Entities(v) => &v.errors,
            SourceBatch::Subjects(v) => &v.errors,
            SourceBatch::Relationships(v) => &v.errors,
        }
    }

    pub fn input_rows(&self) -> usize {
        self.validated() + self.errors().len()
    }
}

/// Validate rows for a table given by name (case-insensitive).
pub fn validate(
    table_name: &str,
    rows: &[Value],
    options: ValidateOptions,
) -> Result<SourceBatch, IngestError> {
    let table = SourceTable::from_name(table_name)?;
    validate_table(table, rows, options).map_err(IngestError::from)
}

/// Validate rows for a known table.
pub fn validate_table(
    table: SourceTable,
    rows: &[Value],
    options: ValidateOptions,
) -> Result<SourceBatch, SchemaDriftError> {
    Ok(match table {
        SourceTable::Accessions => SourceBatch::Accessions(validate_records(rows, options)?),
        SourceTable::Files => SourceBatch::Files(validate_records(rows, options)?),
        SourceTable::Items => SourceBatch::Items(validate_records(rows, options)?),
        SourceTable::Entities => SourceBatch::Entities(validate_records(rows, options)?),
        SourceTable::Subjects => SourceBatch::Subjects(validate_records(rows, options)?),
        SourceTable::Relationships => {
            SourceBatch::Relationships(validate_records(rows, options)?)
        }
    })
}
