//! Error tiers for a provisioning run.
//!
//! - [`FatalError`] stops the run before any remote call is made.
//! - [`CategoryError`] aborts one category's mutation phase; the other
//!   categories still run.
//! - Per-item failures are not errors at all, they are
//!   [`OperationOutcome`](crate::types::OperationOutcome)s with
//!   `succeeded == false`.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::Category;

#[derive(Debug, Error)]
pub enum FatalError {
    #[error("no data_file configured (set it in the config file, CENTRAL_DATA_FILE or --data-file)")]
    MissingDataFile,

    #[error("unsupported data_file extension '{ext}': only csv and xlsx/xls/xlsm/ods are supported")]
    UnsupportedExtension { ext: String },

    #[error("missing required setting '{key}' (config file or ${env})")]
    MissingConfig { key: &'static str, env: &'static str },

    #[error("cannot parse config file {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("manifest has no 'serial' column")]
    MissingSerialColumn,

    #[error("manifest row {row} has an empty serial")]
    EmptySerial { row: usize },

    #[error("cannot read manifest {path}: {reason}")]
    ManifestRead { path: PathBuf, reason: String },

    #[error("login to Central failed: {0}")]
    Auth(String),
}

impl FatalError {
    /// Process exit code, one per error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::MissingDataFile
            | FatalError::MissingConfig { .. }
            | FatalError::ConfigParse { .. } => 2,
            FatalError::UnsupportedExtension { .. }
            | FatalError::MissingSerialColumn
            | FatalError::EmptySerial { .. }
            | FatalError::ManifestRead { .. } => 3,
            FatalError::Auth(_) => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryError {
    #[error("{category} inventory fetch failed with code {code}: {detail}")]
    InventoryFetch {
        category: Category,
        code: u16,
        detail: String,
    },

    #[error("{category} inventory fetch failed: {detail}")]
    Transport { category: Category, detail: String },

    #[error("{category} inventory payload not understood: {detail}")]
    MalformedInventory { category: Category, detail: String },

    #[error("{category} not found in Central: {}", .missing.join(", "))]
    NotFound {
        category: Category,
        missing: Vec<String>,
    },

    #[error("{category} name(s) map to more than one id: {}", .names.join(", "))]
    Ambiguous {
        category: Category,
        names: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_class() {
        let config = FatalError::MissingConfig {
            key: "username",
            env: "CENTRAL_USERNAME",
        };
        let manifest = FatalError::EmptySerial { row: 4 };
        let auth = FatalError::Auth("401".into());
        assert_eq!(config.exit_code(), 2);
        assert_eq!(FatalError::MissingDataFile.exit_code(), 2);
        assert_eq!(manifest.exit_code(), 3);
        assert_eq!(FatalError::MissingSerialColumn.exit_code(), 3);
        assert_eq!(auth.exit_code(), 4);
    }

    #[test]
    fn not_found_names_every_missing_key() {
        let err = CategoryError::NotFound {
            category: Category::Sites,
            missing: vec!["Annex".into(), "Basement".into()],
        };
        assert_eq!(err.to_string(), "sites not found in Central: Annex, Basement");
    }
}
