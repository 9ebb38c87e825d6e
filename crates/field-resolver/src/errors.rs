//! Resolver error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A disagreement between the wizard structure and the contract or data
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriftFault {
    /// Required by the page but the contract lets the caller omit it
    #[error("field '{field_id}' on page {page_number} is required by the wizard but has no value")]
    UnresolvedRequiredField { field_id: String, page_number: u32 },

    /// Value is not one of the field's declared choices
    #[error("field '{field_id}' on page {page_number} has no choice '{value}'")]
    UnknownChoice {
        field_id: String,
        page_number: u32,
        value: String,
    },

    /// Value shape cannot drive the field's interaction
    #[error("field '{field_id}' on page {page_number} cannot use value: {reason}")]
    UnsupportedValue {
        field_id: String,
        page_number: u32,
        reason: String,
    },
}

impl DriftFault {
    pub fn field_id(&self) -> &str {
        match self {
            DriftFault::UnresolvedRequiredField { field_id, .. }
            | DriftFault::UnknownChoice { field_id, .. }
            | DriftFault::UnsupportedValue { field_id, .. } => field_id,
        }
    }

    pub fn page_number(&self) -> u32 {
        match self {
            DriftFault::UnresolvedRequiredField { page_number, .. }
            | DriftFault::UnknownChoice { page_number, .. }
            | DriftFault::UnsupportedValue { page_number, .. } => *page_number,
        }
    }
}

/// Resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("wizard '{wizard_id}' drifted from its contract ({} fault(s)): {}", .faults.len(), join(.faults))]
    Drift {
        wizard_id: String,
        faults: Vec<DriftFault>,
    },
}

impl ResolveError {
    pub fn faults(&self) -> &[DriftFault] {
        match self {
            ResolveError::Drift { faults, .. } => faults,
        }
    }
}

fn join(faults: &[DriftFault]) -> String {
    faults
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
