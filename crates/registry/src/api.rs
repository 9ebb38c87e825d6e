use async_trait::async_trait;
use wizard_core_types::{DataContract, WizardStructure};

use crate::errors::RegistryError;
use crate::model::{WizardInfo, WizardSummary};

#[async_trait]
pub trait WizardCatalog: Send + Sync {
    /// Every loadable wizard, sorted by `wizard_id`
    async fn list(&self) -> Vec<WizardSummary>;

    async fn structure(&self, wizard_id: &str) -> Result<WizardStructure, RegistryError>;

    async fn contract(&self, wizard_id: &str) -> Result<DataContract, RegistryError>;

    async fn info(&self, wizard_id: &str) -> Result<WizardInfo, RegistryError> {
        let structure = self.structure(wizard_id).await?;
        let contract = self.contract(wizard_id).await?;
        Ok(WizardInfo::new(&structure, contract))
    }
}
