//! Airtable export ingestion for the Lakeland v4 migration
//!
//! Turns the JSON exports of the legacy Airtable base into typed source
//! records:
//! - [`load`]: locate and read one export file per table,
//! - [`mappings`]: column label → canonical field name, per table,
//! - [`validate`]: drift detection, renaming, singleton unwrapping and
//!   per-row record construction with error isolation.

mod error;
pub mod load;
pub mod mappings;
pub mod validate;

pub use error::{IngestError, SchemaDriftError};
pub use load::{find_table_file, load_rows, load_table};
pub use mappings::{mapping_for, FieldMapping};
pub use validate::{
    check_key_mappings, observed_fields, validate, validate_records, validate_table, RecordError,
    SourceBatch, ValidateOptions, Validated,
};
