//! Lakeland archive v4 migration
//!
//! Builds v4 destination records from validated Airtable source records:
//! - [`paths`]: NAS path normalization for File rows,
//! - [`build`]: destination record building and cross-table reference
//!   resolution,
//! - [`pipeline`]: the dependency-ordered run over all tables and output
//!   writing,
//! - [`report`]: per-table outcome of a run,
//! - [`config`]: run configuration.

pub mod build;
pub mod config;
pub mod paths;
pub mod pipeline;
pub mod report;

pub use build::{BuildError, BuildOutput, Builder, UnresolvedReference};
pub use config::MigrationConfig;
pub use paths::{PathNormalizer, NO_FILE_SENTINEL, PATH_DELIMITER};
pub use pipeline::{
    check_mappings, dependencies, run_migration, run_with, write_outputs, MappingCheck,
    MigrationOutcome, REPORT_FILE_NAME, RUN_ORDER,
};
pub use report::{MigrationReport, TableReport, TableStatus};
