//! Lakeland archive records (source + v4 destination)
//!
//! This crate defines the typed records that flow through the migration:
//!
//! - [`source`]: one immutable record type per exported Airtable table,
//!   built from rows whose column names have already been mapped.
//! - [`destination`]: the v4 target data model records.
//! - [`value`]: the list-or-scalar normalization applied to raw cells.
//! - [`digest`]: the stable provenance fingerprint shared by all destination
//!   records.

pub mod destination;
pub mod digest;
pub mod source;
pub mod value;

pub use destination::*;
pub use source::{
    AccessionSourceRecord, EntityRelationshipSourceRecord, EntitySourceRecord, FileSourceRecord,
    ItemSourceRecord, SourceRecord, SourceTable, SubjectSourceRecord, UnknownTableError,
};
pub use value::{FieldValue, OneOrMany};
