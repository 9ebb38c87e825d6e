//! Directory-backed catalog
//!
//! ```text
//! <root>/wizard-structures/<wizard_id>.json
//! <root>/data-schemas/<wizard_id>-schema.json
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use wizard_core_types::{is_valid_wizard_id, DataContract, WizardStructure};

use crate::api::WizardCatalog;
use crate::errors::RegistryError;
use crate::model::WizardSummary;

const STRUCTURES_DIR: &str = "wizard-structures";
const CONTRACTS_DIR: &str = "data-schemas";
const CONTRACT_SUFFIX: &str = "-schema.json";

#[derive(Debug, Clone)]
pub struct FsCatalog {
    root: PathBuf,
}

impl FsCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn structure_path(&self, wizard_id: &str) -> PathBuf {
        self.root
            .join(STRUCTURES_DIR)
            .join(format!("{wizard_id}.json"))
    }

    pub fn contract_path(&self, wizard_id: &str) -> PathBuf {
        self.root
            .join(CONTRACTS_DIR)
            .join(format!("{wizard_id}{CONTRACT_SUFFIX}"))
    }

    async fn load_structure(&self, path: &Path, expected: &str) -> Result<WizardStructure, RegistryError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                RegistryError::NotFound(expected.to_string())
            } else {
                RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let structure = WizardStructure::from_json(&raw).map_err(|source| RegistryError::Structure {
            path: path.to_path_buf(),
            source,
        })?;

        if structure.wizard_id != expected {
            return Err(RegistryError::IdMismatch {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                found: structure.wizard_id,
            });
        }
        Ok(structure)
    }
}

fn check_id(wizard_id: &str) -> Result<(), RegistryError> {
    if is_valid_wizard_id(wizard_id) {
        Ok(())
    } else {
        Err(RegistryError::InvalidId(wizard_id.to_string()))
    }
}

#[async_trait]
impl WizardCatalog for FsCatalog {
    async fn list(&self) -> Vec<WizardSummary> {
        let dir = self.root.join(STRUCTURES_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), "cannot list wizard structures: {err}");
                return Vec::new();
            }
        };

        let mut summaries = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(dir = %dir.display(), "error while listing wizard structures: {err}");
                    break;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string) else {
                continue;
            };
            match self.load_structure(&path, &stem).await {
                Ok(structure) => summaries.push(WizardSummary::from(&structure)),
                Err(err) => warn!(path = %path.display(), "skipping wizard structure: {err}"),
            }
        }

        summaries.sort_by(|a, b| a.wizard_id.cmp(&b.wizard_id));
        debug!(count = summaries.len(), "listed wizards");
        summaries
    }

    async fn structure(&self, wizard_id: &str) -> Result<WizardStructure, RegistryError> {
        check_id(wizard_id)?;
        self.load_structure(&self.structure_path(wizard_id), wizard_id)
            .await
    }

    async fn contract(&self, wizard_id: &str) -> Result<DataContract, RegistryError> {
        check_id(wizard_id)?;
        let path = self.contract_path(wizard_id);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                RegistryError::ContractNotFound(wizard_id.to_string())
            } else {
                RegistryError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        DataContract::from_json(&raw).map_err(|source| RegistryError::Contract { path, source })
    }
}
