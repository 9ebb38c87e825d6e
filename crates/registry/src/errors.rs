use std::path::PathBuf;

use thiserror::Error;
use wizard_core_types::StructureError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("wizard '{0}' not found")]
    NotFound(String),

    #[error("no data contract for wizard '{0}'")]
    ContractNotFound(String),

    #[error("'{0}' is not a valid wizard id")]
    InvalidId(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("wizard structure {} is invalid: {source}", .path.display())]
    Structure {
        path: PathBuf,
        #[source]
        source: StructureError,
    },

    #[error("data contract {} is invalid: {source}", .path.display())]
    Contract {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} declares wizard_id '{found}', expected '{expected}'", .path.display())]
    IdMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::NotFound(_) | RegistryError::ContractNotFound(_)
        )
    }
}
