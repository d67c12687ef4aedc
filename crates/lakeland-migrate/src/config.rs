//! Run configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lakeland_ingest_airtable::ValidateOptions;
use serde::{Deserialize, Serialize};

use crate::paths::{default_root_prefixes, PathNormalizer, DIGITIZATION_2019_ROOT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Directory holding one `<table>.json` export per source table.
    pub input_dir: PathBuf,
    /// Directory receiving one JSON file per destination table.
    pub output_dir: PathBuf,
    /// Construct rows on the rayon pool during validation.
    pub parallel_validation: bool,
    /// Replaces the built-in root-prefix table when set.
    pub path_roots: Option<BTreeMap<String, String>>,
    /// Replaces the 2019 digitization event root when set.
    pub digitization_root: Option<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./source_data"),
            output_dir: PathBuf::from("./migrated"),
            parallel_validation: false,
            path_roots: None,
            digitization_root: None,
        }
    }
}

impl MigrationConfig {
    /// Load a configuration file (JSON). Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn path_normalizer(&self) -> PathNormalizer {
        PathNormalizer::new(
            self.path_roots.clone().unwrap_or_else(default_root_prefixes),
            self.digitization_root
                .clone()
                .unwrap_or_else(|| DIGITIZATION_2019_ROOT.to_string()),
        )
    }

    pub fn validate_options(&self) -> ValidateOptions {
        ValidateOptions {
            parallel: self.parallel_validation,
        }
    }
}
