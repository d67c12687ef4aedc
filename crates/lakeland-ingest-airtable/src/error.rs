use std::path::PathBuf;

use lakeland_model::{SourceTable, UnknownTableError};

/// An observed column has no entry in the table's field mapping.
///
/// Fatal for the table: the export's schema changed in a way the mapping
/// tables do not understand yet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema drift in `{table}`: column `{field}` has no entry in the field mapping ({} unmapped in total)", .unmapped.len())]
pub struct SchemaDriftError {
    pub table: SourceTable,
    /// First unmapped column, in order of appearance.
    pub field: String,
    /// Every unmapped column, in order of appearance.
    pub unmapped: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    UnknownTable(#[from] UnknownTableError),

    #[error(transparent)]
    SchemaDrift(#[from] SchemaDriftError),

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{path}` is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{path}` must contain a JSON array of records")]
    NotAnArray { path: PathBuf },
}
