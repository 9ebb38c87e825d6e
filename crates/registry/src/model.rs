use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wizard_core_types::{DataContract, PropertySchema, UserData, ValueType, WizardStructure};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardSummary {
    pub wizard_id: String,
    pub name: String,
    pub url: String,
    pub total_pages: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_at: Option<DateTime<Utc>>,
}

impl From<&WizardStructure> for WizardSummary {
    fn from(structure: &WizardStructure) -> Self {
        Self {
            wizard_id: structure.wizard_id.clone(),
            name: structure.name.clone(),
            url: structure.url.clone(),
            total_pages: structure.page_count(),
            discovered_at: structure.discovered_at,
        }
    }
}

/// What a caller needs to prepare `user_data` for one wizard
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WizardInfo {
    pub wizard_id: String,
    pub name: String,
    pub url: String,
    pub page_count: usize,
    pub contract: DataContract,
    pub example_user_data: UserData,
}

impl WizardInfo {
    pub fn new(structure: &WizardStructure, contract: DataContract) -> Self {
        Self {
            wizard_id: structure.wizard_id.clone(),
            name: structure.name.clone(),
            url: structure.url.clone(),
            page_count: structure.page_count(),
            example_user_data: example_user_data(&contract),
            contract,
        }
    }
}

/// Sample object built from the contract: first example, else first enum
/// value, else a placeholder for the declared type. Strings with a pattern or
/// minimum length and no example are left out.
pub fn example_user_data(contract: &DataContract) -> UserData {
    contract
        .properties
        .iter()
        .filter_map(|(name, schema)| example_value(schema).map(|value| (name.clone(), value)))
        .collect()
}

fn example_value(schema: &PropertySchema) -> Option<Value> {
    if let Some(first) = schema.examples.as_ref().and_then(|examples| examples.first()) {
        return Some(first.clone());
    }
    if let Some(first) = schema.allowed.as_ref().and_then(|allowed| allowed.first()) {
        return Some(first.clone());
    }
    let value = match schema.value_type? {
        // The empty placeholder would fail these constraints
        ValueType::String if schema.pattern.is_some() || schema.min_length.unwrap_or(0) > 0 => {
            return None
        }
        ValueType::String => json!(""),
        ValueType::Boolean => json!(true),
        ValueType::Integer => json!(schema.minimum.map(|min| min.ceil() as i64).unwrap_or(0)),
        ValueType::Number => json!(schema.minimum.unwrap_or(0.0)),
        ValueType::Array => match schema.items.as_deref().and_then(example_value) {
            Some(item) => json!([item]),
            None => json!([]),
        },
    };
    Some(value)
}
