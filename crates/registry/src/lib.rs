//! Wizard artifact catalog
//!
//! Serves the read-only artifacts produced by discovery: one wizard structure
//! and one data contract per `wizard_id`.

pub mod api;
pub mod errors;
pub mod fs;
pub mod memory;
pub mod model;

pub use api::WizardCatalog;
pub use errors::RegistryError;
pub use fs::FsCatalog;
pub use memory::InMemoryCatalog;
pub use model::{example_user_data, WizardInfo, WizardSummary};
