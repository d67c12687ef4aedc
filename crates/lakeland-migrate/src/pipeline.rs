//! Dependency-ordered migration run.
//!
//! Tables are validated and built one at a time in [`RUN_ORDER`]. A table
//! whose export cannot be read or whose columns drifted is `Failed`; every
//! table that depends on it, directly or through another skipped table, is
//! `Skipped`. Row and reference problems never stop the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lakeland_ingest_airtable::{
    check_key_mappings, load_table, mapping_for, observed_fields, validate_table, IngestError,
    SchemaDriftError, ValidateOptions,
};
use lakeland_model::{DestinationRecords, DestinationTable, SourceTable};
use serde_json::Value;

use crate::build::Builder;
use crate::config::MigrationConfig;
use crate::paths::PathNormalizer;
use crate::report::{MigrationReport, TableReport, TableStatus};

/// File name of the serialized run report in the output directory.
pub const REPORT_FILE_NAME: &str = "report.json";

/// Referenced tables come before the tables that reference them.
pub const RUN_ORDER: [SourceTable; 6] = [
    SourceTable::Entities,
    SourceTable::Subjects,
    SourceTable::Relationships,
    SourceTable::Accessions,
    SourceTable::Files,
    SourceTable::Items,
];

/// Tables whose built records `table` resolves references against.
pub fn dependencies(table: SourceTable) -> &'static [SourceTable] {
    match table {
        SourceTable::Entities | SourceTable::Subjects => &[],
        SourceTable::Relationships => &[SourceTable::Entities],
        SourceTable::Accessions => &[SourceTable::Entities],
        SourceTable::Files => &[SourceTable::Accessions, SourceTable::Entities],
        SourceTable::Items => &[
            SourceTable::Accessions,
            SourceTable::Entities,
            SourceTable::Subjects,
            SourceTable::Files,
        ],
    }
}

#[derive(Debug, Clone, Default)]
pub struct MigrationOutcome {
    pub records: DestinationRecords,
    pub report: MigrationReport,
}

/// Run every table, pulling raw rows from `load`.
pub fn run_with<F>(mut load: F, normalizer: PathNormalizer, options: ValidateOptions) -> MigrationOutcome
where
    F: FnMut(SourceTable) -> Result<Vec<Value>, IngestError>,
{
    let mut builder = Builder::new(normalizer);
    let mut outcome = MigrationOutcome::default();

    for table in RUN_ORDER {
        let blocked_by: Vec<SourceTable> = dependencies(table)
            .iter()
            .copied()
            .filter(|dep| {
                outcome
                    .report
                    .table(*dep)
                    .map_or(true, |r| !r.status.is_completed())
            })
            .collect();
        if !blocked_by.is_empty() {
            tracing::warn!(table = %table, blocked_by = ?blocked_by, "skipping table");
            outcome
                .report
                .tables
                .push(TableReport::new(table, TableStatus::Skipped { blocked_by }));
            continue;
        }

        let batch = match load(table).and_then(|rows| {
            validate_table(table, &rows, options).map_err(IngestError::from)
        }) {
            Ok(batch) => batch,
            Err(err) => {
                tracing::error!(table = %table, error = %err, "table failed");
                outcome.report.tables.push(TableReport::new(
                    table,
                    TableStatus::Failed {
                        reason: err.to_string(),
                    },
                ));
                continue;
            }
        };

        let built = builder.build(&batch);

        let mut report = TableReport::new(table, TableStatus::Completed);
        report.input_rows = batch.input_rows();
        report.validated = batch.validated();
        report.built = built.records.len();
        report.record_errors = batch.errors().to_vec();
        report.build_errors = built.errors;
        report.unresolved = built.unresolved;

        outcome.records.extend(built.records);
        outcome.report.tables.push(report);
    }

    let linked = builder.link_files_to_items(&mut outcome.records.files);
    tracing::debug!(linked, "linked files to items");

    tracing::info!(
        input_rows = outcome.report.total_input_rows(),
        built = outcome.report.total_built(),
        rejected = outcome.report.total_rejected(),
        unresolved = outcome.report.total_unresolved(),
        "migration finished"
    );
    outcome
}

/// Run every table from the exports in `config.input_dir`.
pub fn run_migration(config: &MigrationConfig) -> Result<MigrationOutcome> {
    let input_dir = config.input_dir.as_path();
    anyhow::ensure!(
        input_dir.is_dir(),
        "input directory {} does not exist",
        input_dir.display()
    );
    tracing::info!(input = %input_dir.display(), "starting migration");

    Ok(run_with(
        |table| load_table(input_dir, table),
        config.path_normalizer(),
        config.validate_options(),
    ))
}

/// Drift detection result for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingCheck {
    pub table: SourceTable,
    pub rows: usize,
    pub drift: Option<SchemaDriftError>,
}

/// Check every export in `input_dir` against its field mapping without
/// constructing records.
pub fn check_mappings(input_dir: &Path) -> Result<Vec<MappingCheck>> {
    SourceTable::ALL
        .iter()
        .map(|&table| -> Result<MappingCheck> {
            let rows = load_table(input_dir, table)
                .with_context(|| format!("failed to load table {table}"))?;
            let drift = check_key_mappings(&observed_fields(&rows), &mapping_for(table)).err();
            Ok(MappingCheck {
                table,
                rows: rows.len(),
                drift,
            })
        })
        .collect()
}

/// Write one pretty JSON file per destination table plus the run report.
pub fn write_outputs(outcome: &MigrationOutcome, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(DestinationTable::ALL.len() + 1);
    for table in DestinationTable::ALL {
        let json = outcome
            .records
            .table_json(table)
            .with_context(|| format!("failed to serialize {}", table.name()))?;
        let path = output_dir.join(table.file_name());
        write_json(&path, &json)?;
        tracing::debug!(table = table.name(), records = outcome.records.len(table), "wrote table");
        written.push(path);
    }

    let report = serde_json::to_value(&outcome.report).context("failed to serialize report")?;
    let path = output_dir.join(REPORT_FILE_NAME);
    write_json(&path, &report)?;
    written.push(path);

    Ok(written)
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
