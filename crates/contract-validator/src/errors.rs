//! Contract violation types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use wizard_core_types::PropertySchema;

/// What the contract says about a field, echoed back so the caller can
/// correct its data without re-reading the whole contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
}

impl FieldHint {
    pub fn from_schema(schema: Option<&PropertySchema>) -> Self {
        match schema {
            Some(schema) => Self {
                description: schema.description.clone(),
                expected_type: schema.value_type.map(|t| t.as_str().to_string()),
                pattern: schema.pattern.clone(),
                allowed_values: schema.allowed.clone(),
            },
            None => Self::default(),
        }
    }
}

/// A single contract violation
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A required property is absent (or null)
    #[error("missing required field '{name}'")]
    MissingField {
        name: String,
        #[serde(default)]
        hint: FieldHint,
    },

    /// A present property does not satisfy its declared constraints
    #[error("invalid field '{name}': {reason}")]
    InvalidField {
        name: String,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provided: Option<Value>,
        #[serde(default)]
        hint: FieldHint,
    },
}

impl Violation {
    pub fn missing(name: impl Into<String>, schema: Option<&PropertySchema>) -> Self {
        Violation::MissingField {
            name: name.into(),
            hint: FieldHint::from_schema(schema),
        }
    }

    pub fn invalid(
        name: impl Into<String>,
        reason: impl Into<String>,
        provided: &Value,
        schema: &PropertySchema,
    ) -> Self {
        Violation::InvalidField {
            name: name.into(),
            reason: reason.into(),
            provided: Some(provided.clone()),
            hint: FieldHint::from_schema(Some(schema)),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Violation::MissingField { name, .. } | Violation::InvalidField { name, .. } => name,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Violation::MissingField { .. })
    }
}
