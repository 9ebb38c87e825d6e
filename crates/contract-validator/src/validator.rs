//! Contract validation

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use wizard_core_types::{DataContract, PropertySchema, UserData, ValueType};

use crate::errors::Violation;

/// Result of validating one `user_data` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "violations", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<Violation>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationOutcome::Valid => &[],
            ValidationOutcome::Invalid(violations) => violations,
        }
    }
}

/// Validate `data` against `contract`, compiling patterns for this call only.
pub fn validate(data: &UserData, contract: &DataContract) -> ValidationOutcome {
    ContractValidator::new(contract).validate(data)
}

/// Validator bound to one contract, with its patterns compiled up front.
///
/// Patterns are compiled once in [`ContractValidator::new`] and shared by
/// every payload checked through the same validator.
pub struct ContractValidator<'c> {
    contract: &'c DataContract,
    patterns: HashMap<String, Result<Regex, String>>,
}

impl<'c> ContractValidator<'c> {
    pub fn new(contract: &'c DataContract) -> Self {
        let mut patterns = HashMap::new();
        for schema in contract.properties.values() {
            collect_patterns(schema, &mut patterns);
        }
        Self { contract, patterns }
    }

    pub fn contract(&self) -> &DataContract {
        self.contract
    }

    pub fn validate(&self, data: &UserData) -> ValidationOutcome {
        let mut violations = Vec::new();

        for name in &self.contract.required {
            let present = data.get(name).map(|v| !v.is_null()).unwrap_or(false);
            if !present {
                debug!(field = %name, "required field missing");
                violations.push(Violation::missing(name, self.contract.property(name)));
            }
        }

        // Keys unknown to the contract are ignored on purpose.
        for (name, schema) in &self.contract.properties {
            let Some(value) = data.get(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if let Some(reason) = self.check_value(schema, value) {
                debug!(field = %name, reason = %reason, "field failed contract check");
                violations.push(Violation::invalid(name, reason, value, schema));
            }
        }

        if violations.is_empty() {
            info!(fields = data.len(), "user data satisfies contract");
            ValidationOutcome::Valid
        } else {
            info!(violations = violations.len(), "user data rejected by contract");
            ValidationOutcome::Invalid(violations)
        }
    }

    /// First constraint the value breaks, if any.
    fn check_value(&self, schema: &PropertySchema, value: &Value) -> Option<String> {
        if let Some(expected) = schema.value_type {
            if !matches_type(expected, value) {
                return Some(format!(
                    "expected {}, got {}",
                    expected.as_str(),
                    describe(value)
                ));
            }
        }

        if let Some(allowed) = &schema.allowed {
            if !allowed.iter().any(|candidate| values_equal(candidate, value)) {
                return Some(format!(
                    "value must be one of {}",
                    Value::Array(allowed.clone())
                ));
            }
        }

        match value {
            Value::String(text) => self.check_string(schema, text),
            Value::Number(number) => check_range(schema, number.as_f64()?),
            Value::Array(items) => self.check_items(schema, items),
            _ => None,
        }
    }

    fn check_string(&self, schema: &PropertySchema, text: &str) -> Option<String> {
        let length = text.chars().count();
        if let Some(min) = schema.min_length {
            if length < min {
                return Some(format!("must be at least {min} characters"));
            }
        }
        if let Some(max) = schema.max_length {
            if length > max {
                return Some(format!("must be at most {max} characters"));
            }
        }

        if let Some(pattern) = &schema.pattern {
            match self.patterns.get(pattern) {
                Some(Ok(regex)) => {
                    if !regex.is_match(text) {
                        return Some(format!("value does not match pattern {pattern}"));
                    }
                }
                Some(Err(err)) => return Some(format!("unusable pattern {pattern}: {err}")),
                None => return Some(format!("unusable pattern {pattern}")),
            }
        }
        None
    }

    fn check_items(&self, schema: &PropertySchema, items: &[Value]) -> Option<String> {
        let item_schema = schema.items.as_deref()?;
        items.iter().enumerate().find_map(|(index, item)| {
            self.check_value(item_schema, item)
                .map(|reason| format!("item {index}: {reason}"))
        })
    }
}

fn collect_patterns(schema: &PropertySchema, patterns: &mut HashMap<String, Result<Regex, String>>) {
    if let Some(pattern) = &schema.pattern {
        patterns
            .entry(pattern.clone())
            .or_insert_with(|| Regex::new(pattern).map_err(|err| err.to_string()));
    }
    if let Some(items) = &schema.items {
        collect_patterns(items, patterns);
    }
}

fn check_range(schema: &PropertySchema, number: f64) -> Option<String> {
    if let Some(min) = schema.minimum {
        if number < min {
            return Some(format!("value must be >= {min}"));
        }
    }
    if let Some(max) = schema.maximum {
        if number > max {
            return Some(format!("value must be <= {max}"));
        }
    }
    None
}

fn matches_type(expected: ValueType, value: &Value) -> bool {
    match expected {
        ValueType::String => value.is_string(),
        ValueType::Boolean => value.is_boolean(),
        ValueType::Array => value.is_array(),
        ValueType::Number => value.is_number(),
        ValueType::Integer => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
            }
            _ => false,
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
