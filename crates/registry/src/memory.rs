use async_trait::async_trait;
use dashmap::DashMap;
use wizard_core_types::{DataContract, StructureError, WizardStructure};

use crate::api::WizardCatalog;
use crate::errors::RegistryError;
use crate::model::WizardSummary;

/// Catalog held in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    structures: DashMap<String, WizardStructure>,
    contracts: DashMap<String, DataContract>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wizard; the structure is checked the same way files are.
    pub fn insert(
        &self,
        structure: WizardStructure,
        contract: DataContract,
    ) -> Result<(), StructureError> {
        structure.validate()?;
        let wizard_id = structure.wizard_id.clone();
        self.structures.insert(wizard_id.clone(), structure);
        self.contracts.insert(wizard_id, contract);
        Ok(())
    }

    pub fn remove(&self, wizard_id: &str) {
        self.structures.remove(wizard_id);
        self.contracts.remove(wizard_id);
    }
}

#[async_trait]
impl WizardCatalog for InMemoryCatalog {
    async fn list(&self) -> Vec<WizardSummary> {
        let mut summaries: Vec<_> = self
            .structures
            .iter()
            .map(|entry| WizardSummary::from(entry.value()))
            .collect();
        summaries.sort_by(|a, b| a.wizard_id.cmp(&b.wizard_id));
        summaries
    }

    async fn structure(&self, wizard_id: &str) -> Result<WizardStructure, RegistryError> {
        self.structures
            .get(wizard_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::NotFound(wizard_id.to_string()))
    }

    async fn contract(&self, wizard_id: &str) -> Result<DataContract, RegistryError> {
        self.contracts
            .get(wizard_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::ContractNotFound(wizard_id.to_string()))
    }
}
