//! Run report: what happened to each source table.

use lakeland_ingest_airtable::RecordError;
use lakeland_model::SourceTable;
use serde::Serialize;

use crate::build::{BuildError, UnresolvedReference};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    Completed,
    /// Schema drift or unreadable input; nothing was built for this table.
    Failed { reason: String },
    /// Not attempted because a table it depends on did not complete.
    Skipped { blocked_by: Vec<SourceTable> },
}

impl TableStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, TableStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub table: SourceTable,
    pub status: TableStatus,
    pub input_rows: usize,
    pub validated: usize,
    pub built: usize,
    pub record_errors: Vec<RecordError>,
    pub build_errors: Vec<BuildError>,
    pub unresolved: Vec<UnresolvedReference>,
}

impl TableReport {
    pub fn new(table: SourceTable, status: TableStatus) -> Self {
        Self {
            table,
            status,
            input_rows: 0,
            validated: 0,
            built: 0,
            record_errors: Vec::new(),
            build_errors: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    /// Rows that did not make it into the output, at either stage.
    pub fn rejected(&self) -> usize {
        self.record_errors.len() + self.build_errors.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    /// One entry per source table, in run order.
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    pub fn table(&self, table: SourceTable) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn has_failures(&self) -> bool {
        self.tables
            .iter()
            .any(|t| matches!(t.status, TableStatus::Failed { .. }))
    }

    pub fn total_input_rows(&self) -> usize {
        self.tables.iter().map(|t| t.input_rows).sum()
    }

    pub fn total_built(&self) -> usize {
        self.tables.iter().map(|t| t.built).sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.tables.iter().map(TableReport::rejected).sum()
    }

    pub fn total_unresolved(&self) -> usize {
        self.tables.iter().map(|t| t.unresolved.len()).sum()
    }
}
