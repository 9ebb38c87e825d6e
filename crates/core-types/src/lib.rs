//! Shared documents for the wizard runner crates.
//!
//! Two externally supplied, immutable artifacts drive every execution: the
//! [`WizardStructure`] (what to click and type, page by page) and the
//! [`DataContract`] (what the caller must supply). Both are keyed by the same
//! `wizard_id` and joined on `field_id` ↔ property name.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod contract;
pub mod structure;

pub use contract::{DataContract, PropertySchema, ValueType};
pub use structure::{
    ActionSpec, Choice, DatePart, DatePartSpec, FieldSpec, InteractionKind, OutputSpec, PageSpec,
    StructureError, StructureProblem, ValueKind, WizardStructure,
};

/// Caller-supplied values keyed by contract property name.
pub type UserData = serde_json::Map<String, serde_json::Value>;

/// Identifier of a single execution request.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `^[a-z0-9-]+$`
pub fn is_valid_wizard_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// `^[a-z_][a-z0-9_]*$`
pub fn is_valid_field_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wizard_id_pattern() {
        assert!(is_valid_wizard_id("fsa-estimator"));
        assert!(is_valid_wizard_id("loan-simulator-2"));
        assert!(!is_valid_wizard_id(""));
        assert!(!is_valid_wizard_id("FSA"));
        assert!(!is_valid_wizard_id("fsa_estimator"));
    }

    #[test]
    fn field_id_pattern() {
        assert!(is_valid_field_id("birth_month"));
        assert!(is_valid_field_id("_hidden"));
        assert!(is_valid_field_id("parent_income_2"));
        assert!(!is_valid_field_id("2fa"));
        assert!(!is_valid_field_id("Birth"));
        assert!(!is_valid_field_id("birth-month"));
        assert!(!is_valid_field_id(""));
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
